use crate::detection::Detection;
use serde::{Deserialize, Serialize};

/// One detected animal as returned by `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub breed: String,
    pub confidence: f32,
    pub bounding_box: [f32; 4],
}

impl From<Detection> for DetectionRecord {
    fn from(detection: Detection) -> Self {
        Self {
            breed: detection.label,
            confidence: detection.confidence,
            bounding_box: detection.bbox.to_array(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub labels: usize,
}
