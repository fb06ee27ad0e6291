//! `RallyServer` builder and server loop.
//!
//! This is the entry point for running a Rally server. It ties together
//! all the layers: transport → protocol → lobby (sessions + rooms).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rally_protocol::{Codec, JsonCodec};
use rally_room::RoomConfig;
use rally_transport::{WebSocketTransport, upgrade};
use tokio::net::TcpListener;

use crate::config::{LivenessConfig, ServerConfig};
use crate::handler::handle_connection;
use crate::reclaim::spawn_reclaimer;
use crate::status::serve_status;
use crate::{Lobby, RallyError};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) lobby: Arc<Lobby>,
    pub(crate) codec: C,
    pub(crate) liveness: LivenessConfig,
}

/// Builder for configuring and starting a Rally server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), rally::RallyError> {
/// let server = rally::RallyServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RallyServerBuilder {
    bind_addr: String,
    status_addr: Option<String>,
    room_config: RoomConfig,
    liveness: LivenessConfig,
    sweep_interval: Duration,
}

impl RallyServerBuilder {
    /// Creates a new builder with default settings and no status surface.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            status_addr: None,
            room_config: RoomConfig::default(),
            liveness: LivenessConfig::default(),
            sweep_interval: Duration::from_secs(30),
        }
    }

    /// Takes every setting from a loaded [`ServerConfig`].
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.listen_addr.clone(),
            status_addr: config.status_addr.clone(),
            room_config: config.room_config(),
            liveness: config.liveness_config(),
            sweep_interval: config.sweep_interval(),
        }
    }

    /// Sets the address to bind the WebSocket listener to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Enables the HTTP status surface on `addr`.
    pub fn status(mut self, addr: &str) -> Self {
        self.status_addr = Some(addr.to_string());
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    pub fn liveness(mut self, liveness: LivenessConfig) -> Self {
        self.liveness = liveness;
        self
    }

    pub fn sweep_interval(mut self, every: Duration) -> Self {
        self.sweep_interval = every;
        self
    }

    /// Binds the listeners. Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<RallyServer<JsonCodec>, RallyError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let status_listener = match &self.status_addr {
            Some(addr) => Some(TcpListener::bind(addr).await?),
            None => None,
        };

        let state = Arc::new(ServerState {
            lobby: Arc::new(Lobby::new(self.room_config)),
            codec: JsonCodec,
            liveness: self.liveness,
        });

        Ok(RallyServer {
            transport,
            status_listener,
            state,
            sweep_interval: self.sweep_interval,
        })
    }
}

impl Default for RallyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Rally server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RallyServer<C: Codec> {
    transport: WebSocketTransport,
    status_listener: Option<TcpListener>,
    state: Arc<ServerState<C>>,
    sweep_interval: Duration,
}

impl RallyServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> RallyServerBuilder {
        RallyServerBuilder::new()
    }
}

impl<C: Codec> RallyServer<C> {
    /// Returns the address the WebSocket listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the status surface address, if it is enabled.
    pub fn status_addr(&self) -> Option<SocketAddr> {
        self.status_listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
    }

    /// The coordinator behind this server.
    pub fn lobby(&self) -> Arc<Lobby> {
        Arc::clone(&self.state.lobby)
    }

    /// Runs the server accept loop.
    ///
    /// Starts the reclaimer and the status surface, then accepts incoming
    /// connections and spawns a handler task for each. Runs until the
    /// future is dropped.
    pub async fn run(self) -> Result<(), RallyError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Rally server running");

        let reclaimer = spawn_reclaimer(Arc::clone(&self.state.lobby), self.sweep_interval);
        let _reclaimer = AbortOnDrop(reclaimer);

        let _status = self.status_listener.map(|listener| {
            let lobby = Arc::clone(&self.state.lobby);
            AbortOnDrop(tokio::spawn(async move {
                if let Err(e) = serve_status(listener, lobby).await {
                    tracing::error!(error = %e, "status surface stopped");
                }
            }))
        });

        loop {
            match self.transport.accept_tcp().await {
                Ok((stream, peer)) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let upgraded =
                            tokio::time::timeout(state.liveness.handshake_timeout, upgrade(stream, peer))
                                .await;
                        let conn = match upgraded {
                            Ok(Ok(conn)) => conn,
                            Ok(Err(e)) => {
                                tracing::debug!(%peer, error = %e, "upgrade failed");
                                return;
                            }
                            Err(_) => {
                                tracing::debug!(%peer, "upgrade timed out");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Stops a background task when the server future is dropped.
struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
