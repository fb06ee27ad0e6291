//! Wire protocol for Rally.
//!
//! This crate defines everything a client and the room coordinator say to
//! each other:
//!
//! - **Identity** ([`PlayerId`], [`RoomId`], [`RoomCode`]): newtypes
//!   that keep the three kinds of key apart.
//! - **Commands** ([`Command`], [`CommandFrame`]): client requests such as
//!   `create_room` or `update_score`, plus field validation.
//! - **Events** ([`RoomEvent`], [`Fanout`]): server pushes and who each
//!   one is delivered to.
//! - **Acks** ([`Ack`], [`AckBody`], [`ErrorBody`]): the single reply a
//!   caller gets for an ack-bearing command.
//! - **Framing** ([`Envelope`], [`Payload`], [`SystemMessage`]) and the
//!   [`Codec`] that turns them into bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Lobby (commands) → Room actor
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod ack;
mod codec;
mod command;
mod error;
mod event;
mod ids;
mod snapshot;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use ack::{Ack, AckBody, ErrorBody, ErrorKind};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use command::{
    Command, CommandFrame, MAX_DIFFICULTY_LEN, MAX_DISPLAY_NAME_LEN,
    MAX_PLAYER_ID_LEN,
};
pub use error::ProtocolError;
pub use event::{Fanout, RoomEvent};
pub use ids::{PlayerId, ROOM_CODE_ALPHABET, ROOM_CODE_LEN, RoomCode, RoomId};
pub use snapshot::{
    LeaderboardEntry, PlayerSnapshot, PlayerStatus, Ranking, RoomSnapshot,
    RoomStatus,
};
pub use types::{Envelope, Payload, Recipient, SystemMessage};

/// The protocol version clients must present in their handshake.
pub const PROTOCOL_VERSION: u32 = 1;
