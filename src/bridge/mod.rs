//! Protocol bridge: worker websocket in, blank-line-delimited HTTP stream out.
//!
//! # Architecture
//!
//! ```text
//! HTTP client ◀── JobStream (mpsc, cap 1) ◀── job task ◀── worker socket
//!                                               │
//!                                               └── TranscriptSink (once)
//! ```
//!
//! Each job runs as its own tokio task that exclusively owns the worker
//! socket and the accumulator. The outbound channel holds one frame, so the
//! task reads the next worker message only after the previous frame has been
//! handed off. Closing or dropping the [`JobStream`] cancels the job.

mod consumer;


pub use consumer::{ConsumeError, HttpStreamClient, StreamConsumer};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::error::Elapsed;
use tracing::{debug, error, info, warn};

use crate::domain::{
    ConnectionState, JobId, JobOutcome, JobReport, JobRequest, PersistStatus, StreamEvent,
};
use crate::store::{PersistError, TranscriptSink};
use crate::stream::{Accumulator, FrameParser, encode_frame, encode_report_frame};
use crate::worker::{
    ConnectionError, RetryPolicy, TransportError, WorkerSocket, WorkerTransport, decode_message,
    discard_residual, establish,
};

/// Why a job stream ended abnormally
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("worker transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to encode job request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to save transcript: {0}")]
    Persist(#[from] PersistError),
}

/// Item of the outbound stream: one encoded frame or the terminal error
pub type FrameResult = Result<String, BridgeError>;

/// Proxies worker jobs to outbound frame streams
pub struct Bridge<T: WorkerTransport> {
    transport: Arc<T>,
    sink: Arc<dyn TranscriptSink>,
    policy: RetryPolicy,
}

impl<T: WorkerTransport> Clone for Bridge<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            sink: self.sink.clone(),
            policy: self.policy,
        }
    }
}

impl<T: WorkerTransport> Bridge<T> {
    pub fn new(transport: T, sink: Arc<dyn TranscriptSink>, policy: RetryPolicy) -> Self {
        Self {
            transport: Arc::new(transport),
            sink,
            policy,
        }
    }

    /// Start proxying `request` to the worker at `worker_uri`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run_job(&self, request: JobRequest, worker_uri: &str) -> JobStream {
        let (tx, rx) = mpsc::channel(1);
        let job_id = request.id.clone();

        info!("[jobstream:bridge] starting job {} -> {}", job_id, worker_uri);
        let job = BridgeJob {
            transport: self.transport.clone(),
            sink: self.sink.clone(),
            policy: self.policy,
            uri: worker_uri.to_string(),
            request,
            frames: tx,
        };

        JobStream {
            job_id,
            frames: rx,
            task: tokio::spawn(job.run()),
        }
    }
}

/// Outbound side of one job
pub struct JobStream {
    job_id: JobId,
    frames: mpsc::Receiver<FrameResult>,
    task: JoinHandle<JobReport>,
}

impl JobStream {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Next frame, `None` once the job has ended
    pub async fn next(&mut self) -> Option<FrameResult> {
        self.frames.recv().await
    }

    /// Like [`JobStream::next`], but gives up once `idle` passes without a
    /// frame. No frame is lost on timeout.
    pub async fn next_within(&mut self, idle: Duration) -> Result<Option<FrameResult>, Elapsed> {
        tokio::time::timeout(idle, self.frames.recv()).await
    }

    /// Stop the job. Safe to call any number of times.
    pub fn cancel(&mut self) {
        self.frames.close();
    }

    /// Wait for the job task to finish. Drain or cancel the stream first,
    /// the task blocks while an undelivered frame is pending.
    pub async fn join(self) -> Result<JobReport, JoinError> {
        self.task.await
    }
}

struct BridgeJob<T: WorkerTransport> {
    transport: Arc<T>,
    sink: Arc<dyn TranscriptSink>,
    policy: RetryPolicy,
    uri: String,
    request: JobRequest,
    frames: mpsc::Sender<FrameResult>,
}

/// Why the read loop stopped
enum Exit {
    WorkerClosed,
    Cancelled,
    Failed(BridgeError),
}

impl<T: WorkerTransport> BridgeJob<T> {
    async fn run(self) -> JobReport {
        let job_id = self.request.id.clone();
        let mut state = ConnectionState::Connecting;
        let mut acc = Accumulator::new();

        let established = tokio::select! {
            result = establish(&*self.transport, &self.uri, &self.policy) => Some(result),
            _ = self.frames.closed() => None,
        };

        let exit = match established {
            None => Exit::Cancelled,
            Some(Err(e)) => Exit::Failed(e.into()),
            Some(Ok(socket)) => {
                state.transition(ConnectionState::Open);
                let mut worker = OpenSocket::new(socket);
                let exit = self.stream(&mut worker, &mut state, &mut acc).await;
                worker.close(&job_id).await;
                exit
            }
        };

        match exit {
            Exit::WorkerClosed => {
                info!("[jobstream:bridge] job {} closed by worker", job_id);
                state.transition(ConnectionState::Closed);
            }
            Exit::Cancelled => {
                info!("[jobstream:bridge] job {} cancelled by client", job_id);
                state.transition(ConnectionState::Closed);
            }
            Exit::Failed(err) => {
                warn!("[jobstream:bridge] job {} failed: {}", job_id, err);
                state.transition(ConnectionState::Failed);
                // Receiver may already be gone
                let _ = self.frames.send(Err(err)).await;
            }
        }

        let outcome = acc.into_outcome();
        let persist = self.persist(&outcome).await;

        JobReport {
            job_id,
            state,
            outcome,
            persist,
        }
    }

    async fn stream(
        &self,
        worker: &mut OpenSocket<T::Socket>,
        state: &mut ConnectionState,
        acc: &mut Accumulator,
    ) -> Exit {
        let payload = match self.request.to_wire_json() {
            Ok(payload) => payload,
            Err(e) => return Exit::Failed(e.into()),
        };
        if let Err(e) = worker.socket.send_text(payload).await {
            return Exit::Failed(e.into());
        }
        debug!("[jobstream:bridge] job {} request sent", self.request.id);

        let mut parser = FrameParser::line_delimited();

        loop {
            let message = tokio::select! {
                message = worker.socket.recv() => message,
                _ = self.frames.closed() => return Exit::Cancelled,
            };

            let text = match message {
                None => {
                    discard_residual(&mut parser, &self.request.id);
                    return Exit::WorkerClosed;
                }
                Some(Err(e)) => return Exit::Failed(e.into()),
                Some(Ok(text)) => text,
            };
            state.transition(ConnectionState::Streaming);

            for event in decode_message(&mut parser, &text) {
                if acc.is_completed() {
                    debug!(
                        "[jobstream:bridge] job {} ignoring {} after complete",
                        self.request.id,
                        event.kind()
                    );
                    continue;
                }

                let frame = match &event {
                    StreamEvent::Report { output } => {
                        let total = acc.append(&event);
                        encode_report_frame(output, total)
                    }
                    StreamEvent::Logs(raw) => encode_frame(raw),
                    StreamEvent::Error { message, raw } => {
                        warn!(
                            "[jobstream:bridge] job {} worker error: {}",
                            self.request.id, message
                        );
                        encode_frame(raw)
                    }
                    StreamEvent::Complete => {
                        acc.append(&event);
                        worker.close(&self.request.id).await;
                        continue;
                    }
                    StreamEvent::Unknown(_) => continue,
                };

                let frame = match frame {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("[jobstream:bridge] failed to encode frame: {}", e);
                        continue;
                    }
                };
                if self.frames.send(Ok(frame)).await.is_err() {
                    return Exit::Cancelled;
                }
            }
        }
    }

    async fn persist(&self, outcome: &JobOutcome) -> PersistStatus {
        if outcome.transcript.is_empty() {
            debug!(
                "[jobstream:bridge] job {} produced no output, nothing to save",
                self.request.id
            );
            return PersistStatus::Skipped;
        }

        match self.sink.save(&self.request, &outcome.transcript).await {
            Ok(()) => PersistStatus::Saved,
            Err(e) => {
                error!(
                    "[jobstream:bridge] job {} transcript not saved: {}",
                    self.request.id, e
                );
                PersistStatus::Failed(e.to_string())
            }
        }
    }
}

/// Worker socket owned by a job task, closed at most once
struct OpenSocket<S> {
    socket: S,
    closed: bool,
}

impl<S: WorkerSocket> OpenSocket<S> {
    fn new(socket: S) -> Self {
        Self {
            socket,
            closed: false,
        }
    }

    async fn close(&mut self, job_id: &str) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.socket.close().await {
            debug!("[jobstream:bridge] job {} socket close failed: {}", job_id, e);
        }
    }
}
