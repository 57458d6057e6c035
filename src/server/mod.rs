//! HTTP bridge server.
//!
//! Listens on `127.0.0.1:<port>` and accepts:
//! - POST /analyze - Start a job and stream its frames back as `text/event-stream`
//! - GET /health - Liveness and version
//! - GET /transcripts?limit=N - Recently saved transcripts
//!
//! One std thread accepts requests. Each `/analyze` job streams from its own
//! thread while its bridge task runs on the shared tokio runtime.

mod handlers;
mod stream;
mod types;


pub use types::{AnalyzeRequest, HealthResponse, TranscriptsResponse};

use std::io::Read;
use std::sync::Arc;
use std::thread;

use anyhow::{Result, anyhow};
use serde::Serialize;
use tiny_http::{Response, Server};
use tracing::{error, info};

use crate::bridge::Bridge;
use crate::config::Config;
use crate::store::TranscriptDb;
use crate::worker::WorkerTransport;

/// Shared-secret header checked when an auth token is configured
pub const AUTH_HEADER: &str = "X-Jobstream-Token";

/// Everything a request handler needs
pub struct AppState<T: WorkerTransport> {
    pub bridge: Bridge<T>,
    pub worker_url: String,
    pub config: Config,
    /// Source for `/transcripts`; `None` disables the endpoint
    pub history: Option<TranscriptDb>,
    /// Runtime the bridge tasks are spawned on
    pub runtime: tokio::runtime::Handle,
}

pub struct HttpServer<T: WorkerTransport> {
    server: Server,
    state: Arc<AppState<T>>,
}

impl<T: WorkerTransport> HttpServer<T> {
    /// Bind on `127.0.0.1:port`. Port 0 picks a free port.
    pub fn bind(port: u16, state: AppState<T>) -> Result<Self> {
        let bind_addr = format!("127.0.0.1:{}", port);
        let server = Server::http(&bind_addr)
            .map_err(|e| anyhow!("Failed to start server on {}: {}", bind_addr, e))?;

        Ok(Self {
            server,
            state: Arc::new(state),
        })
    }

    /// Port actually bound
    pub fn port(&self) -> Option<u16> {
        self.server.server_addr().to_ip().map(|addr| addr.port())
    }

    /// Run the accept loop on a background thread
    pub fn spawn(self) -> thread::JoinHandle<()> {
        thread::spawn(move || self.serve())
    }

    /// Accept requests until the listener fails
    pub fn serve(self) {
        info!(
            "[jobstream:http] Server listening on http://127.0.0.1:{} (auth: {}, worker: {})",
            self.port().unwrap_or_default(),
            if self.state.config.auth_token().is_some() {
                "enabled"
            } else {
                "disabled"
            },
            self.state.worker_url
        );

        for mut request in self.server.incoming_requests() {
            let method = request.method().to_string();
            let url = request.url().to_string();
            let (path, query) = match url.split_once('?') {
                Some((path, query)) => (path, Some(query)),
                None => (url.as_str(), None),
            };

            if !is_authorized(&request, self.state.config.auth_token()) {
                respond_json(request, 401, &serde_json::json!({ "error": "unauthorized" }));
                continue;
            }

            match (method.as_str(), path) {
                ("POST", "/analyze") => {
                    let body = match read_request_body(
                        &mut request,
                        self.state.config.server.max_body_bytes,
                    ) {
                        Ok(body) => body,
                        Err(response) => {
                            let _ = request.respond(response);
                            continue;
                        }
                    };
                    handlers::handle_analyze(&self.state, &body, request);
                }
                ("GET", "/health") => handlers::handle_health(request),
                ("GET", "/transcripts") => {
                    handlers::handle_transcripts(&self.state, query, request)
                }
                _ => respond_json(request, 404, &serde_json::json!({ "error": "not_found" })),
            }
        }

        error!("[jobstream:http] listener closed");
    }
}

fn is_authorized(request: &tiny_http::Request, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };

    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(AUTH_HEADER))
        .map(|h| h.value.as_str() == expected)
        .unwrap_or(false)
}

fn with_json_content_type<R: Read>(response: Response<R>) -> Response<R> {
    match tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

fn read_request_body(
    request: &mut tiny_http::Request,
    max_bytes: usize,
) -> Result<String, Response<std::io::Cursor<Vec<u8>>>> {
    let mut body = String::new();
    let mut reader = request.as_reader().take((max_bytes + 1) as u64);
    if let Err(e) = reader.read_to_string(&mut body) {
        error!("[jobstream:http] Failed to read body: {}", e);
        let response = with_json_content_type(
            Response::from_string("{\"error\":\"bad_request\"}").with_status_code(400),
        );
        return Err(response);
    }

    if body.len() > max_bytes {
        let response = with_json_content_type(
            Response::from_string("{\"error\":\"payload_too_large\"}").with_status_code(413),
        );
        return Err(response);
    }

    Ok(body)
}

fn respond_json<S: Serialize>(request: tiny_http::Request, status_code: u16, value: &S) {
    let body =
        serde_json::to_string(value).unwrap_or_else(|_| "{\"error\":\"serialize\"}".to_string());
    let response =
        with_json_content_type(Response::from_string(body).with_status_code(status_code));
    let _ = request.respond(response);
}
