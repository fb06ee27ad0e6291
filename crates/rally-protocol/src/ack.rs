//! Acknowledgments: the caller-only reply to an ack-bearing command.

use serde::{Deserialize, Serialize};

use crate::{RoomCode, RoomId, RoomSnapshot};

/// Error classes exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing command fields.
    Validation,
    /// Unknown room, code or player, or no room bound.
    NotFound,
    /// Room full, already started, duplicate name, not all ready.
    Conflict,
    /// A non-host invoked a host-only command.
    Authorization,
    /// Implausible score. Only logged, never sent in an ack.
    AdmissionRejected,
    /// Room-code generation gave up.
    CodeExhausted,
    /// Something broke server-side; the message is generic.
    Internal,
}

/// The failure half of an [`Ack`].
///
/// `code` is a stable snake_case identifier clients can branch on;
/// `message` is for humans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
}

/// The success half of an [`Ack`], one shape per command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AckBody {
    RoomCreated {
        room_id: RoomId,
        room_code: RoomCode,
        room: RoomSnapshot,
    },
    RoomJoined {
        room_id: RoomId,
        room: RoomSnapshot,
    },
    Ready {
        is_ready: bool,
    },
    Started,
    DifficultySet,
    Left,
    RoomState {
        room: RoomSnapshot,
    },
}

/// `{ ok, body }` on success or `{ ok: false, error }` on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub request_id: u64,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<AckBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Ack {
    pub fn ok(request_id: u64, body: AckBody) -> Self {
        Self {
            request_id,
            ok: true,
            body: Some(body),
            error: None,
        }
    }

    pub fn failed(request_id: u64, error: ErrorBody) -> Self {
        Self {
            request_id,
            ok: false,
            body: None,
            error: Some(error),
        }
    }

    /// The error kind, if this ack reports a failure.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
