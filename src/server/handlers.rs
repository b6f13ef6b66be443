use super::types::{DetectionRecord, ErrorResponse, HealthResponse};
use crate::{detection::Detector, imaging};
use axum::{
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const FILE_FIELD: &str = "file";

pub const MODEL_UNAVAILABLE: &str = "Model is not available or failed to load";
pub const MISSING_FILE: &str = "No file part in the request";
pub const NO_FILE_SELECTED: &str = "No file selected for uploading";
pub const EMPTY_FILE: &str = "The uploaded file is empty";
pub const FILE_TOO_LARGE: &str = "The uploaded file is too large";
pub const PROCESSING_FAILED: &str = "A server error occurred while processing the image.";

pub type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Clone)]
pub struct AppState {
    /// `None` when the model failed to load at startup.
    pub detector: Option<Arc<dyn Detector>>,
}

impl AppState {
    pub fn new(detector: Option<Arc<dyn Detector>>) -> Self {
        Self { detector }
    }
}

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<DetectionRecord>>, ApiError> {
    // Checked before the body so an unloaded model wins over any payload.
    let Some(detector) = state.detector else {
        return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, MODEL_UNAVAILABLE));
    };

    let mut multipart = multipart.map_err(|rejection| {
        warn!("Rejected non-multipart upload: {}", rejection);
        api_error(StatusCode::BAD_REQUEST, MISSING_FILE)
    })?;

    let bytes = read_file_field(&mut multipart).await?;
    if bytes.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, EMPTY_FILE));
    }

    let size = bytes.len();
    let image = imaging::decode_image_blocking(bytes).await.map_err(|e| {
        error!("Failed to decode uploaded image ({} bytes): {:?}", size, e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED)
    })?;

    let detections = detector.detect(image).await.map_err(|e| {
        error!("Detection failed: {:?}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED)
    })?;

    if detections.is_empty() {
        warn!("No valid detections found in the image");
    } else {
        info!("Found {} detections", detections.len());
    }

    Ok(Json(
        detections.into_iter().map(DetectionRecord::from).collect(),
    ))
}

/// Returns the bytes of the first `file` part that carries a filename.
async fn read_file_field(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(malformed_upload)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        // A part without a filename is a plain form value, not an upload.
        let Some(file_name) = field.file_name() else {
            continue;
        };
        if file_name.is_empty() {
            return Err(api_error(StatusCode::BAD_REQUEST, NO_FILE_SELECTED));
        }

        info!("Received upload '{}'", file_name);
        return field.bytes().await.map_err(malformed_upload);
    }

    Err(api_error(StatusCode::BAD_REQUEST, MISSING_FILE))
}

fn malformed_upload(e: MultipartError) -> ApiError {
    warn!("Malformed multipart upload: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        api_error(StatusCode::PAYLOAD_TOO_LARGE, FILE_TOO_LARGE)
    } else {
        api_error(StatusCode::BAD_REQUEST, MISSING_FILE)
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: state.detector.is_some(),
        labels: state.detector.as_ref().map_or(0, |d| d.labels().len()),
    })
}
