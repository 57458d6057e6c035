//! Request handlers for the bridge endpoint.

use std::sync::Arc;
use std::thread;

use tiny_http::Request;
use tracing::{error, info, warn};

use super::stream::{EventStreamWriter, pump};
use super::types::{AnalyzeRequest, HealthResponse, TranscriptsResponse};
use super::{AppState, respond_json};
use crate::worker::WorkerTransport;

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 500;

/// Handle GET /health
pub(super) fn handle_health(request: Request) {
    let body = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    respond_json(request, 200, &body);
}

/// Handle POST /analyze: validate, then stream the job on its own thread
pub(super) fn handle_analyze<T: WorkerTransport>(
    state: &Arc<AppState<T>>,
    body: &str,
    request: Request,
) {
    let analyze: AnalyzeRequest = match serde_json::from_str(body) {
        Ok(analyze) => analyze,
        Err(e) => {
            warn!("[jobstream:http] invalid /analyze body: {}", e);
            respond_json(
                request,
                400,
                &serde_json::json!({ "error": "invalid_json", "details": e.to_string() }),
            );
            return;
        }
    };

    if analyze.files.is_empty() {
        respond_json(request, 400, &serde_json::json!({ "error": "no_files" }));
        return;
    }

    let job = analyze.into_job(&state.config);
    info!(
        "[jobstream:http] job {} accepted ({} files, report_type={})",
        job.id,
        job.file_refs.len(),
        job.report_type
    );

    let state = Arc::clone(state);
    thread::spawn(move || {
        let mut stream = {
            let _runtime = state.runtime.enter();
            state.bridge.run_job(job, &state.worker_url)
        };

        match EventStreamWriter::start(request.into_writer()) {
            Ok(writer) => pump(
                &mut stream,
                writer,
                &state.runtime,
                state.config.heartbeat_interval(),
            ),
            Err(e) => info!("[jobstream:http] client left before streaming: {}", e),
        }

        // No-op once the stream has ended
        stream.cancel();
        match state.runtime.block_on(stream.join()) {
            Ok(report) => info!(
                "[jobstream:http] job {} finished: state={}, {} bytes, persist={:?}",
                report.job_id,
                report.state,
                report.outcome.transcript.len(),
                report.persist
            ),
            Err(e) => error!("[jobstream:http] job task failed: {}", e),
        }
    });
}

/// Handle GET /transcripts?limit=N
pub(super) fn handle_transcripts<T: WorkerTransport>(
    state: &AppState<T>,
    query: Option<&str>,
    request: Request,
) {
    let Some(history) = state.history.as_ref() else {
        respond_json(request, 404, &serde_json::json!({ "error": "history_disabled" }));
        return;
    };

    let limit = match parse_limit(query) {
        Ok(limit) => limit,
        Err(err) => {
            respond_json(request, 400, &serde_json::json!({ "error": err }));
            return;
        }
    };

    match history.recent(limit) {
        Ok(transcripts) => {
            respond_json(request, 200, &TranscriptsResponse { transcripts })
        }
        Err(e) => {
            error!("[jobstream:http] failed to list transcripts: {}", e);
            respond_json(request, 500, &serde_json::json!({ "error": "store_error" }));
        }
    }
}

fn parse_limit(query: Option<&str>) -> Result<usize, &'static str> {
    let value = query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .find_map(|pair| pair.strip_prefix("limit="));

    match value {
        None => Ok(DEFAULT_HISTORY_LIMIT),
        Some(v) => v
            .parse::<usize>()
            .map(|n| n.clamp(1, MAX_HISTORY_LIMIT))
            .map_err(|_| "invalid_limit"),
    }
}
