//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes or fields a client sent were
//! unusable. It never describes room state; that is `RoomError`'s job in
//! the room crate.

/// Errors that can occur while decoding or validating client input.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields or an
    /// unknown `type` tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but breaks protocol rules, e.g. a command sent
    /// before the handshake.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A command field is present but unacceptable.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    /// A room code is not six alphanumeric characters.
    #[error("invalid room code {0:?}")]
    InvalidRoomCode(String),
}

impl ProtocolError {
    pub(crate) fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
