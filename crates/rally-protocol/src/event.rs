//! Server-pushed room events and their fan-out.

use serde::{Deserialize, Serialize};

use crate::{LeaderboardEntry, PlayerId, Ranking, Recipient, RoomSnapshot};

/// Which part of the roster receives a message.
///
/// This is a property of the message type, never chosen per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fanout {
    /// Every present player, the originator included.
    Everyone,
    /// Every present player except the originator.
    EveryoneButOrigin,
}

impl Fanout {
    /// Resolves the mode against the player that caused the message.
    pub fn recipient(self, origin: &PlayerId) -> Recipient {
        match self {
            Self::Everyone => Recipient::All,
            Self::EveryoneButOrigin => Recipient::AllExcept(origin.clone()),
        }
    }
}

/// Events a room pushes to its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    /// Someone joined, rebound, toggled ready or left.
    RosterUpdated { room: RoomSnapshot },

    /// The host started the match. Scores and lives are reset.
    MatchStarted { room: RoomSnapshot },

    DifficultyChanged { difficulty: String },

    /// An accepted score update, with the refreshed leaderboard.
    ScoreLeaderboard {
        player_id: PlayerId,
        score: u64,
        lives: u32,
        leaderboard: Vec<LeaderboardEntry>,
    },

    PlayerFinished { player_id: PlayerId, final_score: u64 },

    /// Sent exactly once, when the last present player finishes.
    MatchResults { rankings: Vec<Ranking> },

    /// `new_host` is set when the departing player was the host and
    /// someone is left to take over.
    PlayerLeft {
        player_id: PlayerId,
        new_host: Option<PlayerId>,
    },

    /// The room was reclaimed while players were still attached.
    RoomClosed { reason: String },
}

impl RoomEvent {
    /// Wire name of the event, as used in the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RosterUpdated { .. } => "roster_updated",
            Self::MatchStarted { .. } => "match_started",
            Self::DifficultyChanged { .. } => "difficulty_changed",
            Self::ScoreLeaderboard { .. } => "score_leaderboard",
            Self::PlayerFinished { .. } => "player_finished",
            Self::MatchResults { .. } => "match_results",
            Self::PlayerLeft { .. } => "player_left",
            Self::RoomClosed { .. } => "room_closed",
        }
    }

    /// The fixed fan-out of this event type.
    pub fn fanout(&self) -> Fanout {
        match self {
            Self::ScoreLeaderboard { .. } => Fanout::EveryoneButOrigin,
            _ => Fanout::Everyone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_score_leaderboard_excludes_origin() {
        let score = RoomEvent::ScoreLeaderboard {
            player_id: PlayerId::new("a"),
            score: 10,
            lives: 3,
            leaderboard: vec![],
        };
        assert_eq!(score.fanout(), Fanout::EveryoneButOrigin);

        let others = [
            RoomEvent::DifficultyChanged {
                difficulty: "hard".into(),
            },
            RoomEvent::PlayerFinished {
                player_id: PlayerId::new("a"),
                final_score: 10,
            },
            RoomEvent::MatchResults { rankings: vec![] },
            RoomEvent::PlayerLeft {
                player_id: PlayerId::new("a"),
                new_host: None,
            },
            RoomEvent::RoomClosed {
                reason: "expired".into(),
            },
        ];
        for event in others {
            assert_eq!(event.fanout(), Fanout::Everyone, "{}", event.name());
        }
    }

    #[test]
    fn test_fanout_recipient_resolution() {
        let origin = PlayerId::new("a");
        assert_eq!(Fanout::Everyone.recipient(&origin), Recipient::All);
        assert_eq!(
            Fanout::EveryoneButOrigin.recipient(&origin),
            Recipient::AllExcept(origin.clone())
        );
    }

    #[test]
    fn test_event_json_shape() {
        let event = RoomEvent::PlayerLeft {
            player_id: PlayerId::new("host"),
            new_host: Some(PlayerId::new("next")),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "player_left");
        assert_eq!(json["player_id"], "host");
        assert_eq!(json["new_host"], "next");
        assert_eq!(json["type"], event.name());
    }
}
