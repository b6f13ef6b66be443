pub mod labels;
pub mod postprocess;
pub mod preprocess;
mod types;
mod yolo;

pub use types::*;
pub use yolo::YoloDetector;

use crate::Result;
use async_trait::async_trait;
use image::DynamicImage;

#[async_trait]
pub trait Detector: Send + Sync {
    /// Runs the model on one image. Boxes are in the image's pixel space.
    async fn detect(&self, image: DynamicImage) -> Result<Vec<Detection>>;

    fn labels(&self) -> &[String];
}
