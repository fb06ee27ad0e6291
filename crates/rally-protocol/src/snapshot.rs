//! Serializable views of room state carried in acks and events.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, RoomCode, RoomId};

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a room.
///
/// Transitions are strictly ordered and never go backwards:
///
/// ```text
/// Waiting → Playing → Finished
/// ```
///
/// - **Waiting**: the lobby. Joins, ready toggles and difficulty changes.
/// - **Playing**: locked roster. Score updates and game-overs.
/// - **Finished**: read-only until the reclaimer destroys the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Returns `true` if the room still accepts joins.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// The only state this one may move to, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Playing),
            Self::Playing => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Playing => write!(f, "Playing"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerStatus
// ---------------------------------------------------------------------------

/// Per-player lifecycle inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Waiting,
    Ready,
    Playing,
    Finished,
    /// Departed. The entry is kept for final rankings.
    Left,
}

impl PlayerStatus {
    /// Everyone except departed players counts towards capacity, host
    /// election and the finish condition.
    pub fn is_present(self) -> bool {
        !matches!(self, Self::Left)
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// One roster entry as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: PlayerId,
    pub display_name: String,
    pub is_host: bool,
    pub is_ready: bool,
    pub score: u64,
    pub lives: u32,
    pub status: PlayerStatus,
}

/// Full room view. Players are listed in join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub room_code: RoomCode,
    pub host_id: PlayerId,
    pub status: RoomStatus,
    pub difficulty: Option<String>,
    pub max_players: usize,
    pub players: Vec<PlayerSnapshot>,
}

impl RoomSnapshot {
    /// Players that have not left.
    pub fn present_players(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        self.players.iter().filter(|p| p.status.is_present())
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| &p.player_id == player_id)
    }
}

/// A row of the live leaderboard pushed after each accepted score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub display_name: String,
    pub score: u64,
    pub lives: u32,
    pub status: PlayerStatus,
}

/// A row of the final results. `rank` is the 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    pub rank: usize,
    pub player_id: PlayerId,
    pub display_name: String,
    pub score: u64,
    pub status: PlayerStatus,
}
