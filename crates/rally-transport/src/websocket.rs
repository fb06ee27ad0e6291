//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

fn io_error(kind: std::io::ErrorKind, e: tungstenite::Error) -> std::io::Error {
    std::io::Error::new(kind, e)
}

/// A WebSocket [`Transport`] listening on a TCP socket.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts the next raw TCP stream without upgrading it.
    ///
    /// The server uses this so a slow upgrade handshake runs in its own
    /// task instead of stalling the accept loop. Finish with [`upgrade`].
    pub async fn accept_tcp(
        &self,
    ) -> Result<(TcpStream, SocketAddr), TransportError> {
        self.listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)
    }
}

/// Performs the WebSocket upgrade on an accepted TCP stream.
pub async fn upgrade(
    stream: TcpStream,
    peer: SocketAddr,
) -> Result<WebSocketConnection, TransportError> {
    let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
        TransportError::UpgradeFailed(io_error(
            std::io::ErrorKind::ConnectionRefused,
            e,
        ))
    })?;

    let id =
        ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    tracing::debug!(%id, %peer, "accepted WebSocket connection");

    Ok(WebSocketConnection::new(id, peer, ws))
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, peer) = self.accept_tcp().await?;
        upgrade(stream, peer).await
    }
}

/// A single WebSocket connection.
///
/// The socket is split so a pending `recv` never blocks a concurrent
/// `send` from the same handler.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
    opened_at: Instant,
    /// Milliseconds after `opened_at` of the last inbound frame.
    last_seen_ms: AtomicU64,
}

impl WebSocketConnection {
    fn new(id: ConnectionId, peer: SocketAddr, ws: WsStream) -> Self {
        let (sink, stream) = ws.split();
        Self {
            id,
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            opened_at: Instant::now(),
            last_seen_ms: AtomicU64::new(0),
        }
    }

    /// The remote address of this connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn touch(&self) {
        let elapsed = self.opened_at.elapsed().as_millis() as u64;
        self.last_seen_ms.store(elapsed, Ordering::Relaxed);
    }

    async fn write(&self, msg: Message) -> Result<(), TransportError> {
        self.sink.lock().await.send(msg).await.map_err(|e| match e {
            tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed => {
                TransportError::ConnectionClosed(self.id.to_string())
            }
            other => TransportError::SendFailed(io_error(
                std::io::ErrorKind::BrokenPipe,
                other,
            )),
        })
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        self.write(Message::Binary(data.to_vec().into())).await
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            let msg = stream.next().await;
            if matches!(msg, Some(Ok(_))) {
                self.touch();
            }
            match msg {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // ping, pong and raw frames only count as activity
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(io_error(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn ping(&self) -> Result<(), Self::Error> {
        self.write(Message::Ping(Vec::new().into())).await
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(io_error(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn idle_for(&self) -> Duration {
        let now = self.opened_at.elapsed().as_millis() as u64;
        let last = self.last_seen_ms.load(Ordering::Relaxed);
        Duration::from_millis(now.saturating_sub(last))
    }
}
