//! Scripted in-memory worker for unit tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ReadyState, TransportError, WorkerSocket, WorkerTransport};

/// Counters shared between a test and the socket it scripted
#[derive(Default)]
pub(crate) struct Probe {
    pub polls: AtomicU32,
    pub closes: AtomicU32,
    pub sent: Mutex<Vec<String>>,
}

impl Probe {
    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

pub(crate) type Script = mpsc::UnboundedSender<Result<String, TransportError>>;

pub(crate) struct MockSocket {
    /// Poll count at which the socket reports open; `None` never opens
    opens_at: Option<u32>,
    incoming: mpsc::UnboundedReceiver<Result<String, TransportError>>,
    closed: bool,
    probe: Arc<Probe>,
}

#[async_trait]
impl WorkerSocket for MockSocket {
    fn ready_state(&mut self) -> ReadyState {
        let poll = self.probe.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.closed {
            return ReadyState::Closed;
        }
        match self.opens_at {
            Some(at) if poll >= at => ReadyState::Open,
            _ => ReadyState::Connecting,
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::NotOpen);
        }
        self.probe.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        if self.closed {
            return None;
        }
        self.incoming.recv().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
        Ok(())
    }
}

/// Hands out one pre-scripted socket
pub(crate) struct MockTransport {
    socket: Mutex<Option<MockSocket>>,
}

impl MockTransport {
    /// Socket that opens on the given poll. Worker messages are pushed through
    /// the returned script; dropping it closes the socket from the worker side.
    pub fn new(opens_at: Option<u32>) -> (Self, Script, Arc<Probe>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let probe = Arc::new(Probe::default());
        let socket = MockSocket {
            opens_at,
            incoming: rx,
            closed: false,
            probe: probe.clone(),
        };
        (
            Self {
                socket: Mutex::new(Some(socket)),
            },
            tx,
            probe,
        )
    }
}

impl WorkerTransport for MockTransport {
    type Socket = MockSocket;

    fn open(&self, _uri: &str) -> MockSocket {
        self.socket
            .lock()
            .unwrap()
            .take()
            .expect("mock transport opened twice")
    }
}
