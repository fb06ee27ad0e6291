//! The binding table: which connection speaks for which player.
//!
//! # Concurrency note
//!
//! `BindingTable` is a plain pair of `HashMap`s. The server wraps it in a
//! single mutex and never holds that lock across an await, so every
//! operation here is atomic with respect to the others. In particular a
//! disconnect and an explicit leave racing on the same connection both call
//! [`BindingTable::unbind`], and exactly one of them gets the binding back.

use std::collections::HashMap;
use std::time::Instant;

use rally_protocol::{PlayerId, RoomId};
use rally_transport::ConnectionId;

use crate::SessionError;

/// What a bound connection stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub bound_at: Instant,
}

/// Connection ⇄ (room, player) mapping.
///
/// ```text
/// create/join ──→ bind() ──→ lookup() on every command
///                   │
///                   ├─ same player, new socket → old socket displaced
///                   ▼
///          leave/disconnect ──→ unbind()   (at most once per binding)
///          room destroyed   ──→ purge_room()
/// ```
#[derive(Debug, Default)]
pub struct BindingTable {
    by_connection: HashMap<ConnectionId, Binding>,

    /// Reverse index, kept in lockstep with `by_connection`. A player
    /// identity in a room is spoken for by at most one connection.
    by_player: HashMap<(RoomId, PlayerId), ConnectionId>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `connection` to `player_id` in `room_id`.
    ///
    /// Binding a connection again as the same player is a no-op refresh.
    /// If another connection currently speaks for the same player (a
    /// reconnect from a new socket), that connection loses its binding and
    /// is returned so the caller can tell it apart from a fresh bind.
    ///
    /// # Errors
    /// - [`SessionError::BoundElsewhere`] if `connection` is bound to a
    ///   different room
    /// - [`SessionError::BoundAsOther`] if `connection` already speaks for
    ///   another player in this room
    pub fn bind(
        &mut self,
        connection: ConnectionId,
        room_id: RoomId,
        player_id: PlayerId,
        now: Instant,
    ) -> Result<Option<ConnectionId>, SessionError> {
        if let Some(existing) = self.by_connection.get(&connection) {
            if existing.room_id != room_id {
                return Err(SessionError::BoundElsewhere {
                    connection,
                    room_id: existing.room_id,
                });
            }
            if existing.player_id != player_id {
                return Err(SessionError::BoundAsOther {
                    connection,
                    player_id: existing.player_id.clone(),
                });
            }
        }

        let key = (room_id, player_id.clone());
        let displaced = match self.by_player.get(&key) {
            Some(&other) if other != connection => {
                self.by_connection.remove(&other);
                tracing::info!(
                    %room_id,
                    %player_id,
                    old = %other,
                    new = %connection,
                    "player rebound to a new connection"
                );
                Some(other)
            }
            _ => None,
        };

        self.by_player.insert(key, connection);
        self.by_connection.insert(
            connection,
            Binding {
                room_id,
                player_id,
                bound_at: now,
            },
        );
        Ok(displaced)
    }

    /// Removes the binding for `connection`, returning it if there was one.
    ///
    /// Idempotent: a second call for the same connection returns `None`.
    pub fn unbind(&mut self, connection: ConnectionId) -> Option<Binding> {
        let binding = self.by_connection.remove(&connection)?;
        let key = (binding.room_id, binding.player_id.clone());
        if self.by_player.get(&key) == Some(&connection) {
            self.by_player.remove(&key);
        }
        Some(binding)
    }

    pub fn lookup(&self, connection: ConnectionId) -> Option<&Binding> {
        self.by_connection.get(&connection)
    }

    /// Like [`lookup`](Self::lookup), but as an error for command paths.
    ///
    /// # Errors
    /// [`SessionError::NotBound`] if the connection is not in a room.
    pub fn require(&self, connection: ConnectionId) -> Result<&Binding, SessionError> {
        self.lookup(connection)
            .ok_or(SessionError::NotBound(connection))
    }

    /// The connection currently speaking for `player_id` in `room_id`.
    pub fn connection_for(
        &self,
        room_id: RoomId,
        player_id: &PlayerId,
    ) -> Option<ConnectionId> {
        self.by_player
            .get(&(room_id, player_id.clone()))
            .copied()
    }

    /// Drops every binding into `room_id` and returns the affected
    /// connections. Used when a room is destroyed.
    pub fn purge_room(&mut self, room_id: RoomId) -> Vec<ConnectionId> {
        let purged: Vec<ConnectionId> = self
            .by_connection
            .iter()
            .filter(|(_, b)| b.room_id == room_id)
            .map(|(c, _)| *c)
            .collect();
        for connection in &purged {
            self.by_connection.remove(connection);
        }
        self.by_player.retain(|(rid, _), _| *rid != room_id);
        purged
    }

    /// Number of bound connections.
    pub fn len(&self) -> usize {
        self.by_connection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_connection.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
