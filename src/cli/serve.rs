//! Serve command implementation

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use jobstream::bridge::Bridge;
use jobstream::config::Config;
use jobstream::server::{AppState, HttpServer};
use jobstream::store::TranscriptDb;
use jobstream::worker::WsTransport;

/// Run the HTTP bridge until the listener fails
pub async fn serve_command(
    config: Config,
    port: Option<u16>,
    worker: Option<String>,
) -> Result<()> {
    let db = TranscriptDb::open(&config.db_path())?;
    let worker_url = worker.unwrap_or_else(|| config.worker.url.clone());
    let port = port.unwrap_or(config.server.port);

    if config.auth_token().is_none() {
        warn!("[jobstream:http] no auth_token configured, accepting unauthenticated requests");
    }

    let state = AppState {
        bridge: Bridge::new(WsTransport, Arc::new(db.clone()), config.retry_policy()),
        worker_url,
        config,
        history: Some(db),
        runtime: tokio::runtime::Handle::current(),
    };
    let server = HttpServer::bind(port, state)?;

    println!(
        "Listening on http://127.0.0.1:{}/analyze",
        server.port().unwrap_or(port)
    );
    tokio::task::spawn_blocking(move || server.serve())
        .await
        .context("HTTP server thread panicked")?;

    Ok(())
}
