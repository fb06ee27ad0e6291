//! Unified error type for the Rally server.

use rally_protocol::{ErrorBody, ErrorKind, ProtocolError};
use rally_room::RoomError;
use rally_session::SessionError;
use rally_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RallyError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid field).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (not bound, bound elsewhere).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, not host, ...).
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The configuration file exists but could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl RallyError {
    /// Wire form for a failed ack.
    pub fn to_error_body(&self) -> ErrorBody {
        match self {
            Self::Room(e) => e.to_error_body(),
            Self::Protocol(e) => ErrorBody {
                kind: ErrorKind::Validation,
                code: match e {
                    ProtocolError::InvalidRoomCode(_) => "invalid_room_code",
                    ProtocolError::InvalidField { .. } => "invalid_field",
                    _ => "invalid_message",
                }
                .to_string(),
                message: e.to_string(),
            },
            Self::Session(e @ SessionError::BoundElsewhere { .. }) => ErrorBody {
                kind: ErrorKind::Conflict,
                code: "bound_elsewhere".to_string(),
                message: e.to_string(),
            },
            Self::Session(e @ SessionError::BoundAsOther { .. }) => ErrorBody {
                kind: ErrorKind::Conflict,
                code: "bound_as_other".to_string(),
                message: e.to_string(),
            },
            Self::Session(e @ SessionError::NotBound(_)) => ErrorBody {
                kind: ErrorKind::NotFound,
                code: "not_in_room".to_string(),
                message: e.to_string(),
            },
            Self::Transport(_) | Self::Io(_) | Self::Config(_) => ErrorBody {
                kind: ErrorKind::Internal,
                code: "internal".to_string(),
                message: "internal server error".to_string(),
            },
        }
    }
}
