//! Rooms for Rally.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! roster, status and match clock. Everything that touches a room goes
//! through its [`RoomHandle`].
//!
//! # Key types
//!
//! - [`Room`]: the lobby/match state machine, free of any I/O
//! - [`RoomRegistry`]: creates rooms, resolves codes, reclaims actors
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Broadcaster`]: delivers a room's events to attached players
//! - [`AdmissionGuard`]: score plausibility check

mod actor;
mod admission;
mod broadcast;
mod code;
mod config;
mod error;
mod registry;
mod room;

pub use actor::{JoinReceipt, RoomHandle};
pub use admission::AdmissionGuard;
pub use broadcast::{Broadcaster, PlayerSender};
pub use code::{MAX_CODE_ATTEMPTS, generate_code, generate_code_with};
pub use config::{AdmissionConfig, RoomConfig};
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{Broadcast, Departure, JoinKind, Player, ReclaimReason, Room, Seat};
