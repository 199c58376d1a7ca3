use std::sync::Arc;
use tracing::{info, warn};
use cors_core::config::AppConfig;
use cors_api::app::{build_app, server_addr};
use cors_api::observability::init_tracing;
use cors_api::shutdown::shutdown_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Arc::new(AppConfig::load()?);
    init_tracing(&cfg);
    enforce_prod_cors(&cfg)?;

    let addr = server_addr(&cfg)?;
    let router = build_app(cfg.clone())?;
    info!(%addr, env = %cfg.app.env, origin = %cfg.cors.origin, "starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

fn enforce_prod_cors(cfg: &AppConfig) -> anyhow::Result<()> {
    let wildcard = cfg.cors.origin.trim() == "*";
    if cfg.cors.credentials && wildcard {
        if cfg.is_production() {
            anyhow::bail!("CORS_ORIGIN=* cannot be combined with CORS_CREDENTIALS=true in production");
        }
        warn!("wildcard origin with credentials enabled - browsers will reject credentialed responses");
    }
    Ok(())
}
