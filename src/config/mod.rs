mod types;

pub use types::*;

use crate::{Error, Result};
use std::{env, path::Path};
use tracing::debug;

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    debug!("Loading configuration from: {}", config_path);

    let mut config = load_from(&config_path).await?;
    apply_env_overrides(&mut config, |key| env::var(key).ok())?;
    config.validate()?;

    Ok(config)
}

/// Reads a YAML config file. A missing file yields the built-in defaults.
pub async fn load_from(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !tokio::fs::try_exists(path).await? {
        debug!("No configuration file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let config_str = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&config_str)?;

    Ok(config)
}

/// `MODEL_PATH` and `PORT` take precedence over the file.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup("MODEL_PATH") {
        config.model.path = path.into();
    }

    if let Some(port) = lookup("PORT") {
        config.server.port = port
            .parse()
            .map_err(|_| Error::config(format!("Invalid PORT value: '{}'", port)))?;
    }

    Ok(())
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let model = &self.model;

        if !(0.0..=1.0).contains(&model.confidence_threshold) {
            return Err(Error::config(format!(
                "model.confidence_threshold must be within [0, 1], got {}",
                model.confidence_threshold
            )));
        }

        if !(0.0..=1.0).contains(&model.iou_threshold) {
            return Err(Error::config(format!(
                "model.iou_threshold must be within [0, 1], got {}",
                model.iou_threshold
            )));
        }

        if model.input_size == 0 {
            return Err(Error::config("model.input_size must be positive"));
        }

        if model.max_detections == 0 {
            return Err(Error::config("model.max_detections must be positive"));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(Error::config("server.max_upload_bytes must be positive"));
        }

        Ok(())
    }
}
