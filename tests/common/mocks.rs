use async_trait::async_trait;
use breed_detector::{
    Error, Result,
    detection::{Detection, Detector},
};
use image::DynamicImage;
use std::sync::{Arc, Mutex};

/// Mock detector for testing
#[derive(Debug, Default)]
pub struct MockDetector {
    pub detections: Vec<Detection>,
    pub labels: Vec<String>,
    pub error: Option<String>,
    calls: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl MockDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detections(mut self, detections: Vec<Detection>) -> Self {
        self.detections = detections;
        self
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Dimensions of every image the detector was called with.
    pub fn get_calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Detector for MockDetector {
    async fn detect(&self, image: DynamicImage) -> Result<Vec<Detection>> {
        self.calls
            .lock()
            .unwrap()
            .push((image.width(), image.height()));

        if let Some(ref error) = self.error {
            return Err(Error::inference(error.clone()));
        }

        Ok(self.detections.clone())
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}
