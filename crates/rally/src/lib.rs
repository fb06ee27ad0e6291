//! # Rally
//!
//! Room coordinator for small multiplayer arcade games.
//!
//! Players create or join a room by a six-character code, ready up, play a
//! match while streaming scores, and get a ranked result. The server keeps
//! every room in its own actor, binds each WebSocket connection to one
//! player, and reclaims rooms that empty out or outlive their TTL.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), rally::RallyError> {
//! let config = rally::ServerConfig::load()?;
//! let server = rally::RallyServerBuilder::from_config(&config).build().await?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod error;
mod handler;
mod lobby;
mod reclaim;
mod server;
pub mod status;

pub use config::{LivenessConfig, ServerConfig};
pub use error::RallyError;
pub use lobby::{Lobby, LobbyCounts};
pub use reclaim::spawn_reclaimer;
pub use server::{RallyServer, RallyServerBuilder};

pub mod prelude {
    pub use crate::{Lobby, RallyError, RallyServer, RallyServerBuilder, ServerConfig};
    pub use rally_protocol::{
        Ack, AckBody, Command, CommandFrame, Envelope, Payload, PlayerId, RoomCode, RoomEvent,
        SystemMessage,
    };
}
