//! Bounded wait for a worker socket to become writable.

use std::time::Duration;

use tracing::{debug, warn};

use super::{ConnectionError, ReadyState, WorkerSocket, WorkerTransport};

/// How long to wait for the worker socket to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_millis(1000),
        }
    }
}

/// Open a socket to `uri` and wait until it is writable.
///
/// The ready state is checked once per `interval`, `max_attempts` times. When
/// attempts run out the socket is closed and discarded. Dropping the returned
/// future aborts the wait.
pub async fn establish<T: WorkerTransport>(
    transport: &T,
    uri: &str,
    policy: &RetryPolicy,
) -> Result<T::Socket, ConnectionError> {
    let mut socket = transport.open(uri);

    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;

        match socket.ready_state() {
            ReadyState::Open => {
                debug!(
                    "[jobstream:worker] {} open after {}/{} attempts",
                    uri, attempt, policy.max_attempts
                );
                return Ok(socket);
            }
            state => {
                debug!(
                    "[jobstream:worker] {} not open yet ({:?}), attempt {}/{}",
                    uri, state, attempt, policy.max_attempts
                );
            }
        }
    }

    warn!(
        "[jobstream:worker] giving up on {} after {} attempts",
        uri, policy.max_attempts
    );
    if let Err(e) = socket.close().await {
        debug!("[jobstream:worker] close after timeout failed: {}", e);
    }

    Err(ConnectionError::Timeout {
        uri: uri.to_string(),
        attempts: policy.max_attempts,
    })
}
