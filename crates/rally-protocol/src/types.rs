//! Framing types: every frame on the wire is an [`Envelope`].

use serde::{Deserialize, Serialize};

use crate::{Ack, CommandFrame, PlayerId, RoomEvent};

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Concrete delivery target inside one room, resolved from a
/// [`Fanout`](crate::Fanout) and the originating player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every present player in the room.
    All,
    /// Every present player except this one.
    AllExcept(PlayerId),
}

impl Recipient {
    /// Returns `true` if `player` is covered by this target.
    pub fn includes(&self, player: &PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::AllExcept(p) => p != player,
        }
    }
}

// ---------------------------------------------------------------------------
// SystemMessage
// ---------------------------------------------------------------------------

/// Connection plumbing that exists independently of any room.
///
/// Internally tagged: `{ "type": "Handshake", "version": 1 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    /// Client → Server, first frame on every connection.
    Handshake { version: u32 },

    /// Server → Client: the connection is ready for commands.
    HandshakeAck { connection_id: u64, server_time: u64 },

    /// Client → Server application-level keep-alive with the client's
    /// clock, echoed back for round-trip measurement.
    Heartbeat { client_time: u64 },

    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Either direction: the sender is closing the connection.
    Disconnect { reason: String },

    /// Server → Client: the frame could not be processed at all.
    /// `code` follows HTTP conventions (400 bad request, 408 timeout).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// What an envelope carries.
///
/// Adjacently tagged, so the first level always reads
/// `{ "type": "Command", "data": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    System(SystemMessage),
    /// Client → Server.
    Command(CommandFrame),
    /// Server → Client, only to the caller.
    Ack(Ack),
    /// Server → Client, fanned out within a room.
    Event(RoomEvent),
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level frame.
///
/// ```text
/// ┌──────────────────────────────────┐
/// │ seq: 42                          │  ← per-sender counter
/// │ timestamp: 15000                 │  ← ms since the sender's epoch
/// │ ┌──────────────────────────────┐ │
/// │ │ payload: Event(...)          │ │
/// │ └──────────────────────────────┘ │
/// └──────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Each side keeps its own counter, starting at 0 for the handshake.
    pub seq: u64,

    /// Milliseconds since the connection was opened, from the sender's
    /// point of view.
    pub timestamp: u64,

    pub payload: Payload,
}

// =========================================================================
// Tests
// =========================================================================
