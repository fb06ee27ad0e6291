//! Error types for the room layer.

use rally_protocol::{ErrorBody, ErrorKind, PlayerId, RoomCode, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist (or was reclaimed).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// No live room uses this code.
    #[error("no room with code {0}")]
    CodeNotFound(RoomCode),

    #[error("player {0} not in room {1}")]
    PlayerNotFound(PlayerId, RoomId),

    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The lobby phase is over; the roster and settings are locked.
    #[error("room {0} has already started")]
    AlreadyStarted(RoomId),

    /// Another present player already uses this display name.
    #[error("display name {0:?} is taken in this room")]
    NameTaken(String),

    #[error("not every player in room {0} is ready")]
    NotAllReady(RoomId),

    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    #[error("max_players {requested} is outside 1..={limit}")]
    InvalidMaxPlayers { requested: usize, limit: usize },

    /// Score or game-over from someone who is not currently playing.
    #[error("player {0} is not playing")]
    NotPlaying(PlayerId),

    /// The score is implausible for the time elapsed. Soft: logged and
    /// dropped, never surfaced to the client.
    #[error("score {score} from {player_id} exceeds ceiling {ceiling}")]
    AdmissionRejected {
        player_id: PlayerId,
        score: u64,
        ceiling: u64,
    },

    #[error("no free room code after {attempts} attempts")]
    CodeExhausted { attempts: usize },

    /// The room's actor is gone or its queue is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    /// The client-facing class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::CodeNotFound(_) | Self::PlayerNotFound(..) => {
                ErrorKind::NotFound
            }
            Self::RoomFull(_)
            | Self::AlreadyStarted(_)
            | Self::NameTaken(_)
            | Self::NotAllReady(_)
            | Self::NotPlaying(_) => ErrorKind::Conflict,
            Self::NotHost(_) => ErrorKind::Authorization,
            Self::InvalidMaxPlayers { .. } => ErrorKind::Validation,
            Self::AdmissionRejected { .. } => ErrorKind::AdmissionRejected,
            Self::CodeExhausted { .. } => ErrorKind::CodeExhausted,
            Self::Unavailable(_) => ErrorKind::Internal,
        }
    }

    /// Stable snake_case identifier for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::CodeNotFound(_) => "room_not_found",
            Self::PlayerNotFound(..) => "player_not_found",
            Self::RoomFull(_) => "room_full",
            Self::AlreadyStarted(_) => "already_started",
            Self::NameTaken(_) => "name_taken",
            Self::NotAllReady(_) => "not_all_ready",
            Self::NotHost(_) => "not_host",
            Self::InvalidMaxPlayers { .. } => "invalid_max_players",
            Self::NotPlaying(_) => "not_playing",
            Self::AdmissionRejected { .. } => "score_rejected",
            Self::CodeExhausted { .. } => "code_exhausted",
            Self::Unavailable(_) => "internal",
        }
    }

    /// Wire form for an ack. Internal failures get a generic message so
    /// nothing about the server's state leaks.
    pub fn to_error_body(&self) -> ErrorBody {
        let message = match self.kind() {
            ErrorKind::Internal => "internal server error".to_string(),
            _ => self.to_string(),
        };
        ErrorBody {
            kind: self.kind(),
            code: self.code().to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(RoomError::RoomFull(RoomId(1)).kind(), ErrorKind::Conflict);
        assert_eq!(
            RoomError::NotHost(PlayerId::new("a")).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            RoomError::CodeNotFound(RoomCode::parse("ABCDEF").unwrap()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            RoomError::CodeExhausted { attempts: 32 }.kind(),
            ErrorKind::CodeExhausted
        );
    }

    #[test]
    fn test_to_error_body_hides_internal_details() {
        let body = RoomError::Unavailable(RoomId(4)).to_error_body();
        assert_eq!(body.kind, ErrorKind::Internal);
        assert_eq!(body.message, "internal server error");
        assert!(!body.message.contains("R-4"));
    }

    #[test]
    fn test_to_error_body_keeps_domain_message() {
        let body = RoomError::NameTaken("Ann".into()).to_error_body();
        assert_eq!(body.code, "name_taken");
        assert!(body.message.contains("Ann"));
    }
}
