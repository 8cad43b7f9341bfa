use sentinel_atlas_core::{api, build_state, config::Config};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ----------------------------------------------------------------
    // 0. Config
    // ----------------------------------------------------------------
    let config = Config::from_env()?;
    info!(host = %config.host, port = config.port, signer = ?config.signer, "⚙️  config loaded");

    // ----------------------------------------------------------------
    // 1. Signer, pipeline, registry
    // ----------------------------------------------------------------
    let state = build_state(&config)?;
    if config.signer == sentinel_atlas_core::config::SignerKind::Placeholder {
        warn!("manifest signatures use the shared-secret PLACEHOLDER scheme; they prove nothing");
    }

    // ----------------------------------------------------------------
    // 2. HTTP
    // ----------------------------------------------------------------
    let app = api::app(Arc::new(state));
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("🚀 listening on http://{}", addr);
    info!("   - POST /hash               : SHA-256 of the request body");
    info!("   - POST /cases              : submit a case, returns its manifest");
    info!("   - GET  /cases/{{id}}         : case status and timeline");
    info!("   - GET  /cases/{{id}}/manifest: stored manifest");
    info!("   - POST /verify             : structural manifest check");

    axum::serve(listener, app).await?;
    Ok(())
}
