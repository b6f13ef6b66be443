pub mod handlers;
mod types;

pub use handlers::AppState;
pub use types::*;

use crate::{
    Error, Result,
    config::{Config, ModelConfig, ServerConfig},
    detection::{Detector, YoloDetector},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

pub async fn run(config: Config) -> Result<()> {
    let detector = load_detector(config.model.clone()).await;
    let app = router(AppState::new(detector), &config.server)?;

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");

    Ok(())
}

pub fn router(state: AppState, config: &ServerConfig) -> Result<Router> {
    let router = Router::new()
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.cors_origins)?),
        )
        .with_state(state);

    Ok(router)
}

/// A load failure leaves the service up; `/predict` then reports the model
/// as unavailable.
pub async fn load_detector(config: ModelConfig) -> Option<Arc<dyn Detector>> {
    let loaded = tokio::task::spawn_blocking(move || YoloDetector::load(&config))
        .await
        .map_err(|e| Error::internal(format!("model loading task failed: {}", e)))
        .and_then(|result| result);

    match loaded {
        Ok(detector) => {
            info!(
                "Detection model loaded successfully with {} labels",
                detector.labels().len()
            );
            let detector: Arc<dyn Detector> = Arc::new(detector);
            Some(detector)
        }
        Err(e) => {
            error!("Error loading detection model: {}", e);
            None
        }
    }
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| Error::config(format!("Invalid CORS origin: '{}'", origin)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
