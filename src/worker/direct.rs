//! Direct worker client: talks to the worker socket without the HTTP bridge.

use tracing::{debug, info, warn};

use super::{
    RetryPolicy, WorkerSocket, WorkerTransport, decode_message, discard_residual, establish,
};
use crate::bridge::BridgeError;
use crate::domain::{JobOutcome, JobRequest, StreamEvent};
use crate::store::TranscriptSink;
use crate::stream::{Accumulator, FrameParser};

/// Run one job straight against the worker.
///
/// Waits for the socket to open (bounded by `policy`), sends the request, and
/// calls `on_update` with the full transcript after every report. On
/// `complete` the socket is closed and a non-empty transcript saved once. A
/// transport error ends the run without saving.
pub async fn run_direct<T, F>(
    transport: &T,
    sink: &dyn TranscriptSink,
    uri: &str,
    policy: &RetryPolicy,
    request: &JobRequest,
    mut on_update: F,
) -> Result<JobOutcome, BridgeError>
where
    T: WorkerTransport,
    F: FnMut(&str) + Send,
{
    let mut socket = establish(transport, uri, policy).await?;

    let payload = request.to_wire_json()?;
    info!("[jobstream:worker] sending job {} to {}", request.id, uri);
    if let Err(e) = socket.send_text(payload).await {
        close_quietly(&mut socket, &request.id).await;
        return Err(e.into());
    }

    let mut parser = FrameParser::line_delimited();
    let mut acc = Accumulator::new();

    'read: while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(text) => text,
            Err(e) => {
                warn!("[jobstream:worker] job {} transport error: {}", request.id, e);
                close_quietly(&mut socket, &request.id).await;
                return Err(e.into());
            }
        };

        for event in decode_message(&mut parser, &text) {
            match &event {
                StreamEvent::Report { .. } => on_update(acc.append(&event)),
                StreamEvent::Complete => {
                    acc.append(&event);
                    if let Err(e) = socket.close().await {
                        warn!("[jobstream:worker] close after complete failed: {}", e);
                    }
                    break 'read;
                }
                StreamEvent::Error { message, .. } => {
                    warn!("[jobstream:worker] job {} worker error: {}", request.id, message);
                }
                StreamEvent::Logs(_) | StreamEvent::Unknown(_) => {}
            }
        }
    }

    if !acc.is_completed() {
        discard_residual(&mut parser, &request.id);
    }

    let outcome = acc.into_outcome();
    if outcome.completed && !outcome.transcript.is_empty() {
        sink.save(request, &outcome.transcript).await?;
        info!("[jobstream:worker] saved transcript for job {}", request.id);
    }

    Ok(outcome)
}

/// Close after a failure; the run already has an error to report
async fn close_quietly<S: WorkerSocket>(socket: &mut S, job_id: &str) {
    if let Err(e) = socket.close().await {
        debug!("[jobstream:worker] job {} socket close failed: {}", job_id, e);
    }
}
