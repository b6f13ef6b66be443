pub mod config;
pub mod detection;
pub mod error;
pub mod imaging;
pub mod server;

pub use error::{Error, Result};
