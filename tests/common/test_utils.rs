use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use breed_detector::{
    config::ServerConfig,
    detection::{BoundingBox, Detection, Detector},
    server::{self, AppState},
};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use std::{io::Cursor, sync::Arc};

pub const BOUNDARY: &str = "breed-detector-test-boundary";

/// One part of a multipart form body.
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(file_name: &'a str, content: &'a [u8]) -> Self {
        Self {
            name: "file",
            file_name: Some(file_name),
            content,
        }
    }

    pub fn text(name: &'a str, content: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            content: content.as_bytes(),
        }
    }
}

/// Build a router backed by the given detector, or by none to simulate a
/// model that failed to load.
pub fn create_test_app(detector: Option<Arc<dyn Detector>>) -> Router {
    create_test_app_with_config(detector, &ServerConfig::default())
}

pub fn create_test_app_with_config(
    detector: Option<Arc<dyn Detector>>,
    config: &ServerConfig,
) -> Router {
    server::router(AppState::new(detector), config).unwrap()
}

/// Encode a solid-color PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([139, 90, 43]));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        part.name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn predict_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn detection(label: &str, confidence: f32, bbox: [f32; 4]) -> Detection {
    Detection {
        class_id: 0,
        label: label.to_string(),
        confidence,
        bbox: BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
    }
}
