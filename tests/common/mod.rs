//! Shared test utilities: a scripted websocket worker on a loopback port

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// One action the worker takes after it has read the job request
#[derive(Debug, Clone)]
pub enum Step {
    Send(String),
    Pause(Duration),
    /// Drop the TCP connection without a closing handshake
    Reset,
}

pub fn report(output: &str) -> Step {
    Step::Send(serde_json::json!({ "type": "report", "output": output }).to_string())
}

pub fn logs(content: &str) -> Step {
    Step::Send(serde_json::json!({ "type": "logs", "content": content }).to_string())
}

pub fn complete() -> Step {
    Step::Send(r#"{"type":"complete"}"#.to_string())
}

#[derive(Default)]
struct WorkerLog {
    requests: Mutex<Vec<String>>,
    client_closes: AtomicU32,
}

/// Worker that plays the same script to every connection
pub struct FakeWorker {
    pub url: String,
    log: Arc<WorkerLog>,
}

impl FakeWorker {
    /// Must be called from within a tokio runtime
    pub async fn start(script: Vec<Step>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        let log = Arc::new(WorkerLog::default());

        let accept_log = log.clone();
        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                tokio::spawn(serve_connection(tcp, script.clone(), accept_log.clone()));
            }
        });

        Self { url, log }
    }

    /// Job requests received, raw JSON text
    pub fn requests(&self) -> Vec<String> {
        self.log.requests.lock().unwrap().clone()
    }

    /// Close frames received from clients
    pub fn client_closes(&self) -> u32 {
        self.log.client_closes.load(Ordering::SeqCst)
    }
}

async fn serve_connection(tcp: TcpStream, script: Vec<Step>, log: Arc<WorkerLog>) {
    let Ok(ws) = accept_async(tcp).await else {
        return;
    };
    let (mut sink, mut source) = ws.split();

    match source.next().await {
        Some(Ok(Message::Text(text))) => log.requests.lock().unwrap().push(text.to_string()),
        _ => return,
    }

    let reader_log = log.clone();
    let reader = tokio::spawn(async move {
        while let Some(message) = source.next().await {
            match message {
                Ok(Message::Close(_)) => {
                    reader_log.client_closes.fetch_add(1, Ordering::SeqCst);
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });

    for step in script {
        match step {
            Step::Send(text) => {
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Step::Pause(duration) => tokio::time::sleep(duration).await,
            Step::Reset => {
                reader.abort();
                return;
            }
        }
    }

    let _ = reader.await;
}

/// Address nothing is listening on
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}/ws", addr)
}

/// Poll `check` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    check()
}

/// Async variant of [`wait_until`] for use inside the runtime
pub async fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
