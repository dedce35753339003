use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use leccion_backend::core::config::ServerSettings;
use leccion_backend::core::logging;
use leccion_backend::server::router::router;
use leccion_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize().await?;
    logging::init(&state.paths);

    let bind_addr = ServerSettings::from_config(&state.config, |name| env::var(name).ok()).bind_addr();

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!("Listening on {}", addr);

    let app: Router = router(state.clone());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
