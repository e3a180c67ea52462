//! `tollgate serve` - Run the HTTP server.

use crate::{config::load_config, routes, state::AppState};
use std::path::Path;
use std::sync::Arc;
use tollgate_session::spawn_sweeper;

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let cfg = load_config(config_path)?;
    let state = Arc::new(AppState::init(&cfg).await?);

    let sweeper = spawn_sweeper(
        state.sessions.context().clone(),
        state.cfg.session.sweep_interval()?,
    );

    let app = routes::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&state.cfg.server.bind).await?;
    tracing::info!("tollgate listening on {}", state.cfg.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    state.db.close().await;
    tracing::info!("tollgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
