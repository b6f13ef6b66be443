use anyhow::{Context, Result};
use breed_detector::{config, server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over `server.logs.level`. Either may be a bare level or a
/// full filter directive such as `breed_detector=debug,tower_http=warn`.
fn log_filter(config_level: &str, rust_log: Option<String>) -> Result<EnvFilter> {
    let directives = rust_log.unwrap_or_else(|| config_level.to_string());
    EnvFilter::try_new(&directives).with_context(|| format!("invalid log filter '{}'", directives))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()
        .await
        .context("failed to load configuration")?;

    let filter = log_filter(&config.server.logs.level, std::env::var("RUST_LOG").ok())?;
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        model = %config.model.path.display(),
        "breed detector starting"
    );

    server::run(config).await?;

    Ok(())
}
