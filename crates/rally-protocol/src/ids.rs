//! Identity newtypes: players, rooms and the shareable room code.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// A stable, client-supplied player identifier.
///
/// Clients keep the same id across reconnects; this is what lets a new
/// connection rebind to an existing roster entry instead of duplicating it.
/// Serialized as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// RoomId
// ---------------------------------------------------------------------------

/// Internal room identifier, allocated by the registry.
///
/// Opaque to clients; they address rooms by [`RoomCode`] and only echo the
/// id back. Serialized as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// Number of characters in a room code.
pub const ROOM_CODE_LEN: usize = 6;

/// Characters codes are generated from. `I`, `O`, `0` and `1` are left
/// out because players read codes aloud and retype them.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// A six-character, human-shareable room code.
///
/// Always stored upper-case, so equality and hashing are case-insensitive
/// with respect to what the player typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalizes and validates user input.
    ///
    /// Surrounding whitespace is ignored and letters are upper-cased.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidRoomCode`] unless the input is exactly
    /// [`ROOM_CODE_LEN`] ASCII alphanumerics.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let trimmed = input.trim();
        if trimmed.chars().count() != ROOM_CODE_LEN
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ProtocolError::InvalidRoomCode(input.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Builds a code from alphabet indices. Used by the generator, which
    /// already guarantees the length and character set.
    pub fn from_alphabet_indices(indices: [usize; ROOM_CODE_LEN]) -> Self {
        let code = indices
            .iter()
            .map(|&i| ROOM_CODE_ALPHABET[i % ROOM_CODE_ALPHABET.len()] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
