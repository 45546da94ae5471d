use std::sync::Arc;

use taskdo_relay::{routes, RelaySettings, TokenRelay};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    taskdo_core::init()?;

    let settings = RelaySettings::from_env()?;
    let addr = settings.addr;
    let relay = Arc::new(TokenRelay::new(settings));

    let (bound, server) = warp::serve(routes(relay)).try_bind_with_graceful_shutdown(addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for shutdown signal: {}", e);
        }
    })?;

    tracing::info!("Token relay listening on {}", bound);
    server.await;
    tracing::info!("Token relay stopped");
    Ok(())
}
