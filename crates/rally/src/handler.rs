//! Per-connection handler: handshake, command routing and keep-alive.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version
//!   2. Send HandshakeAck → connection is live
//!   3. Loop over three sources until the socket goes away:
//!      - inbound frames → system messages or lobby commands
//!      - the outbound channel → room events pushed by actors
//!      - the keep-alive timer → ping, or close when idle too long

use std::sync::Arc;

use rally_protocol::{
    Codec, Envelope, PROTOCOL_VERSION, Payload, ProtocolError, SystemMessage,
};
use rally_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::server::ServerState;
use crate::RallyError;

/// Drop guard that runs the disconnect path when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async part.
struct DisconnectGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        state.lobby.connection_closed();
        tokio::spawn(async move {
            state.lobby.disconnect(conn_id).await;
        });
    }
}

/// Outbound framing state for one connection.
struct Outbound<'a, C: Codec> {
    conn: &'a WebSocketConnection,
    codec: &'a C,
    seq: u64,
    epoch: Instant,
}

impl<C: Codec> Outbound<'_, C> {
    fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    async fn send(&mut self, payload: Payload) -> Result<(), RallyError> {
        let envelope = Envelope {
            seq: self.seq,
            timestamp: self.elapsed_ms(),
            payload,
        };
        self.seq += 1;
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn send_error(&mut self, code: u16, message: impl Into<String>) -> Result<(), RallyError> {
        self.send(Payload::System(SystemMessage::Error {
            code,
            message: message.into(),
        }))
        .await
    }
}

/// Handles a single connection from upgrade to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), RallyError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let mut out = Outbound {
        conn: &conn,
        codec: &state.codec,
        seq: 0,
        epoch: Instant::now(),
    };

    // --- Step 1: Handshake ---
    perform_handshake(&mut out, &state).await?;
    tracing::info!(%conn_id, "connection ready");

    state.lobby.connection_opened();
    let _guard = DisconnectGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    // --- Step 2: Message loop ---
    let (tx, mut rx) = mpsc::unbounded_channel::<Payload>();
    let liveness = state.liveness;
    let mut keepalive = tokio::time::interval_at(
        Instant::now() + liveness.keepalive_interval,
        liveness.keepalive_interval,
    );
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            received = conn.recv() => {
                let data = match received {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };
                if handle_frame(&mut out, &state, conn_id, &tx, &data).await? {
                    break;
                }
            }
            Some(payload) = rx.recv() => {
                out.send(payload).await?;
            }
            _ = keepalive.tick() => {
                let idle = conn.idle_for();
                if idle > liveness.keepalive_timeout {
                    tracing::warn!(%conn_id, idle_ms = idle.as_millis() as u64, "connection idle, closing");
                    let _ = out.send_error(408, "keep-alive timeout").await;
                    break;
                }
                conn.ping().await?;
            }
        }
    }

    let _ = conn.close().await;
    // _guard drops here → disconnect fires.
    Ok(())
}

/// Receives the handshake and answers it.
async fn perform_handshake<C: Codec>(
    out: &mut Outbound<'_, C>,
    state: &ServerState<C>,
) -> Result<(), RallyError> {
    let data = match tokio::time::timeout(state.liveness.handshake_timeout, out.conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            let _ = out.send_error(408, "handshake timed out").await;
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let version = match state.codec.decode::<Envelope>(&data).map(|e| e.payload) {
        Ok(Payload::System(SystemMessage::Handshake { version })) => version,
        _ => {
            out.send_error(400, "expected Handshake").await?;
            return Err(ProtocolError::InvalidMessage(
                "first message must be Handshake".into(),
            )
            .into());
        }
    };

    if version != PROTOCOL_VERSION {
        out.send_error(
            400,
            format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let connection_id = out.conn.id().into_inner();
    let server_time = out.elapsed_ms();
    out.send(Payload::System(SystemMessage::HandshakeAck {
        connection_id,
        server_time,
    }))
    .await
}

/// Handles one inbound frame. Returns `true` if the connection should close.
async fn handle_frame<C: Codec>(
    out: &mut Outbound<'_, C>,
    state: &ServerState<C>,
    conn_id: ConnectionId,
    tx: &mpsc::UnboundedSender<Payload>,
    data: &[u8],
) -> Result<bool, RallyError> {
    let envelope: Envelope = match state.codec.decode(data) {
        Ok(env) => env,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
            out.send_error(400, format!("undecodable frame: {e}")).await?;
            return Ok(false);
        }
    };

    match envelope.payload {
        Payload::System(SystemMessage::Heartbeat { client_time }) => {
            let server_time = out.elapsed_ms();
            out.send(Payload::System(SystemMessage::HeartbeatAck {
                client_time,
                server_time,
            }))
            .await?;
        }
        Payload::System(SystemMessage::Disconnect { reason }) => {
            tracing::info!(%conn_id, %reason, "client disconnected");
            return Ok(true);
        }
        Payload::System(SystemMessage::Handshake { .. }) => {
            out.send_error(400, "already handshaken").await?;
        }
        Payload::System(other) => {
            tracing::debug!(%conn_id, message = ?other, "ignoring unexpected system message");
        }
        Payload::Command(frame) => {
            if let Some(ack) = state.lobby.handle(conn_id, tx, frame).await {
                out.send(Payload::Ack(ack)).await?;
            }
        }
        Payload::Ack(_) | Payload::Event(_) => {
            out.send_error(400, "clients may only send commands").await?;
        }
    }

    Ok(false)
}
