//! Backend worker connectivity.
//!
//! The worker is an external process that accepts one job-request document on
//! a websocket and answers with an ordered sequence of typed events. This
//! module provides the transport seam ([`WorkerTransport`] / [`WorkerSocket`]),
//! the tokio-tungstenite implementation, the bounded open-wait used before the
//! first send, and the direct (bridge-less) client.

mod connect;
mod direct;
mod ws;

#[cfg(test)]
pub(crate) mod mock;

pub use connect::{RetryPolicy, establish};
pub use direct::run_direct;
pub use ws::{WsSocket, WsTransport};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::StreamEvent;
use crate::stream::FrameParser;

/// Readiness of a worker socket, as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Transport-level failure on an established socket
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("socket is not open")]
    NotOpen,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The worker never became writable
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("worker at {uri} did not open after {attempts} attempts")]
    Timeout { uri: String, attempts: u32 },
}

/// One bidirectional connection to the worker
#[async_trait]
pub trait WorkerSocket: Send {
    /// Current readiness. Polled by [`establish`]; must not block.
    fn ready_state(&mut self) -> ReadyState;

    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next message from the worker, `None` once the socket has closed.
    ///
    /// Must be cancel-safe: it is raced against client cancellation.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the socket. Closing an already closed socket is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Factory for worker sockets
pub trait WorkerTransport: Send + Sync + 'static {
    type Socket: WorkerSocket + 'static;

    /// Create a socket and start connecting. Returns immediately.
    fn open(&self, uri: &str) -> Self::Socket;
}

/// Split one worker message into events.
///
/// The message is fed to a line-delimited parser, then its tail is released as
/// a frame of its own when complete. Malformed frames are logged and skipped.
pub(crate) fn decode_message(parser: &mut FrameParser, message: &str) -> Vec<StreamEvent> {
    let mut frames = parser.feed(message);
    frames.extend(parser.take_trailing_frame());

    let mut events = Vec::with_capacity(frames.len());
    for frame in frames {
        let value = match frame {
            Ok(value) => value,
            Err(e) => {
                warn!("[jobstream:worker] skipping frame: {}", e);
                continue;
            }
        };
        match StreamEvent::from_value(value) {
            Ok(StreamEvent::Unknown(kind)) => {
                debug!("[jobstream:worker] ignoring `{}` event", kind);
            }
            Ok(event) => events.push(event),
            Err(e) => warn!("[jobstream:worker] skipping event: {}", e),
        }
    }
    events
}

/// Worker socket closed: report a frame that was cut short.
///
/// Complete residuals are released by [`decode_message`] as each message
/// arrives, so anything left here is truncated.
pub(crate) fn discard_residual(parser: &mut FrameParser, job_id: &str) -> bool {
    match parser.finish() {
        Some(Err(e)) => {
            warn!("[jobstream:worker] job {} closed mid-frame: {}", job_id, e);
            true
        }
        Some(Ok(_)) | None => false,
    }
}
