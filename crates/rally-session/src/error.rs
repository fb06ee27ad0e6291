//! Error types for the session layer.

use rally_protocol::{PlayerId, RoomId};
use rally_transport::ConnectionId;

/// Errors raised by the binding table.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection already belongs to another room. Clients must
    /// leave before joining elsewhere; nothing is migrated implicitly.
    #[error("{connection} is already bound to room {room_id}")]
    BoundElsewhere {
        connection: ConnectionId,
        room_id: RoomId,
    },

    /// The connection already speaks for a different player in the same
    /// room. One connection is one player.
    #[error("{connection} is already bound as player {player_id}")]
    BoundAsOther {
        connection: ConnectionId,
        player_id: PlayerId,
    },

    /// The connection has not created or joined a room.
    #[error("{0} is not in a room")]
    NotBound(ConnectionId),
}
