//! HTTP/JSON server for browser clients.

pub mod error;
pub mod routes;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::service::ChatService;

pub use error::ApiError;
pub use routes::create_router;

/// Bind `host:port` and serve until Ctrl-C.
pub async fn run(service: Arc<ChatService>, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Cannot bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "Server listening");

    axum::serve(listener, create_router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
