//! tokio-tungstenite worker socket.

use async_trait::async_trait;
use futures::{FutureExt, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use super::{ReadyState, TransportError, WorkerSocket, WorkerTransport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens websocket connections to the worker
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl WorkerTransport for WsTransport {
    type Socket = WsSocket;

    /// Must be called from within a tokio runtime (the handshake is spawned).
    fn open(&self, uri: &str) -> WsSocket {
        WsSocket::connect(uri)
    }
}

enum Inner {
    Connecting(JoinHandle<Result<WsStream, tungstenite::Error>>),
    Open { stream: WsStream, closing: bool },
    Closed,
}

/// Websocket to the worker. The handshake runs in the background until
/// [`WorkerSocket::ready_state`] observes it finished.
pub struct WsSocket {
    uri: String,
    inner: Inner,
}

impl WsSocket {
    pub fn connect(uri: &str) -> Self {
        let target = uri.to_string();
        let handshake = tokio::spawn(async move {
            connect_async(target.as_str())
                .await
                .map(|(stream, _response)| stream)
        });

        Self {
            uri: uri.to_string(),
            inner: Inner::Connecting(handshake),
        }
    }

    fn is_closed_error(err: &tungstenite::Error) -> bool {
        matches!(
            err,
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed
        )
    }
}

#[async_trait]
impl WorkerSocket for WsSocket {
    fn ready_state(&mut self) -> ReadyState {
        if let Inner::Connecting(handshake) = &mut self.inner {
            if !handshake.is_finished() {
                return ReadyState::Connecting;
            }
            let next = match FutureExt::now_or_never(&mut *handshake) {
                Some(Ok(Ok(stream))) => {
                    debug!("[jobstream:worker] connected to {}", self.uri);
                    Inner::Open {
                        stream,
                        closing: false,
                    }
                }
                Some(Ok(Err(e))) => {
                    warn!("[jobstream:worker] handshake with {} failed: {}", self.uri, e);
                    Inner::Closed
                }
                Some(Err(e)) => {
                    warn!("[jobstream:worker] handshake task for {} ended: {}", self.uri, e);
                    Inner::Closed
                }
                None => return ReadyState::Connecting,
            };
            self.inner = next;
        }

        match &self.inner {
            Inner::Connecting(_) => ReadyState::Connecting,
            Inner::Open { closing: false, .. } => ReadyState::Open,
            Inner::Open { closing: true, .. } => ReadyState::Closing,
            Inner::Closed => ReadyState::Closed,
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        match &mut self.inner {
            Inner::Open {
                stream,
                closing: false,
            } => {
                stream.send(Message::Text(text)).await?;
                Ok(())
            }
            _ => Err(TransportError::NotOpen),
        }
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let Inner::Open { stream, .. } = &mut self.inner else {
                return None;
            };

            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text.to_string())),
                Some(Ok(Message::Binary(bytes))) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("[jobstream:worker] close frame from {}: {:?}", self.uri, frame);
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) if Self::is_closed_error(&e) => {
                    self.inner = Inner::Closed;
                    return None;
                }
                Some(Err(e)) => {
                    self.inner = Inner::Closed;
                    return Some(Err(e.into()));
                }
                None => {
                    self.inner = Inner::Closed;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match &mut self.inner {
            Inner::Connecting(handshake) => {
                handshake.abort();
                self.inner = Inner::Closed;
                Ok(())
            }
            Inner::Open { closing: true, .. } | Inner::Closed => Ok(()),
            Inner::Open { stream, closing } => {
                *closing = true;
                match stream.close(None).await {
                    Ok(()) => Ok(()),
                    Err(e) if Self::is_closed_error(&e) => {
                        self.inner = Inner::Closed;
                        Ok(())
                    }
                    Err(e) => {
                        self.inner = Inner::Closed;
                        Err(e.into())
                    }
                }
            }
        }
    }
}

impl Drop for WsSocket {
    fn drop(&mut self) {
        if let Inner::Connecting(handshake) = &self.inner {
            handshake.abort();
        }
    }
}
