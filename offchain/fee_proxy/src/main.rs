use anyhow::Context;
use fee_proxy::{router, AppState, ProxyConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ProxyConfig::from_env().context("failed to load proxy configuration")?;
    if !config.has_credentials() {
        warn!("OKX credentials are not set; /api/okx-fee will answer 500 until they are");
    }
    info!(base_url = %config.base_url, timeout = ?config.timeout, "upstream configured");

    let addr = config.bind_addr.clone();
    let app = router(AppState::new(config).context("failed to build upstream client")?);
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
