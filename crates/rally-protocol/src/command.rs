//! Client commands.
//!
//! Every command except `create_room` and `join_room` acts on the room the
//! sending connection is currently bound to, so those carry no room or
//! player fields; the server resolves them from the session binding.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, ProtocolError, RoomCode};

pub const MAX_PLAYER_ID_LEN: usize = 64;
pub const MAX_DISPLAY_NAME_LEN: usize = 24;
pub const MAX_DIFFICULTY_LEN: usize = 32;

/// A command plus the id the client uses to match the acknowledgment.
///
/// `request_id` is echoed back verbatim in the [`Ack`](crate::Ack). It may
/// be omitted for fire-and-forget commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandFrame {
    #[serde(default)]
    pub request_id: u64,
    pub command: Command,
}

/// Requests a client can make.
///
/// Internally tagged, so on the wire a command looks like
/// `{ "type": "join_room", "room_code": "ABC234", ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Open a new room with the caller as host.
    CreateRoom {
        player_id: PlayerId,
        display_name: String,
        #[serde(default)]
        max_players: Option<usize>,
    },

    /// Join, or rebind to, a room by its shareable code.
    JoinRoom {
        room_code: String,
        player_id: PlayerId,
        display_name: String,
    },

    /// Toggle readiness. A no-op for the host.
    SetReady,

    /// Host only: begin the match.
    StartMatch,

    /// Host only, before the match: pick the difficulty label.
    SetDifficulty { difficulty: String },

    /// Report the caller's current score. Fire-and-forget.
    UpdateScore {
        score: u64,
        #[serde(default)]
        lives: Option<u32>,
    },

    /// Report the caller's game-over. Fire-and-forget.
    FinishPlayer { final_score: u64 },

    LeaveRoom,

    QueryRoomState,
}

impl Command {
    /// Wire name of the command, as used in the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create_room",
            Self::JoinRoom { .. } => "join_room",
            Self::SetReady => "set_ready",
            Self::StartMatch => "start_match",
            Self::SetDifficulty { .. } => "set_difficulty",
            Self::UpdateScore { .. } => "update_score",
            Self::FinishPlayer { .. } => "finish_player",
            Self::LeaveRoom => "leave_room",
            Self::QueryRoomState => "query_room_state",
        }
    }

    /// Score and game-over reports get no acknowledgment.
    pub fn expects_ack(&self) -> bool {
        !matches!(self, Self::UpdateScore { .. } | Self::FinishPlayer { .. })
    }

    /// Checks field-level rules that do not depend on room state.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidField`] or [`ProtocolError::InvalidRoomCode`]
    /// naming the first offending field.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::CreateRoom {
                player_id,
                display_name,
                max_players,
            } => {
                validate_player_id(player_id)?;
                validate_display_name(display_name)?;
                if *max_players == Some(0) {
                    return Err(ProtocolError::field(
                        "max_players",
                        "must be at least 1",
                    ));
                }
                Ok(())
            }
            Self::JoinRoom {
                room_code,
                player_id,
                display_name,
            } => {
                RoomCode::parse(room_code)?;
                validate_player_id(player_id)?;
                validate_display_name(display_name)
            }
            Self::SetDifficulty { difficulty } => {
                let trimmed = difficulty.trim();
                if trimmed.is_empty() {
                    return Err(ProtocolError::field("difficulty", "must not be empty"));
                }
                if trimmed.chars().count() > MAX_DIFFICULTY_LEN {
                    return Err(ProtocolError::field(
                        "difficulty",
                        format!("longer than {MAX_DIFFICULTY_LEN} characters"),
                    ));
                }
                Ok(())
            }
            Self::SetReady
            | Self::StartMatch
            | Self::UpdateScore { .. }
            | Self::FinishPlayer { .. }
            | Self::LeaveRoom
            | Self::QueryRoomState => Ok(()),
        }
    }
}

fn validate_player_id(player_id: &PlayerId) -> Result<(), ProtocolError> {
    let id = player_id.as_str();
    if id.trim().is_empty() {
        return Err(ProtocolError::field("player_id", "must not be empty"));
    }
    if id.chars().count() > MAX_PLAYER_ID_LEN {
        return Err(ProtocolError::field(
            "player_id",
            format!("longer than {MAX_PLAYER_ID_LEN} characters"),
        ));
    }
    Ok(())
}

fn validate_display_name(name: &str) -> Result<(), ProtocolError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::field("display_name", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(ProtocolError::field(
            "display_name",
            format!("longer than {MAX_DISPLAY_NAME_LEN} characters"),
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ProtocolError::field(
            "display_name",
            "contains control characters",
        ));
    }
    Ok(())
}
