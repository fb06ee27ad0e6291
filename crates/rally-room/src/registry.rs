//! Room registry: creates rooms, resolves codes, and tracks live actors.

use std::collections::HashMap;

use rally_protocol::{RoomCode, RoomId, RoomSnapshot};

use crate::actor::spawn_room;
use crate::code::{MAX_CODE_ATTEMPTS, generate_code};
use crate::{PlayerSender, Room, RoomConfig, RoomError, RoomHandle, Seat};

/// Every live room, by id and by code.
///
/// The registry only indexes rooms; all per-room state lives in the
/// actors. Callers hold it behind a lock and clone handles out before
/// awaiting on them.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RoomHandle>,
    codes: HashMap<RoomCode, RoomId>,
    next_room_id: u64,
    config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            codes: HashMap::new(),
            next_room_id: 1,
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Opens a room with `host` as its only player and spawns its actor.
    ///
    /// Returns the handle plus the room as it looks right after creation.
    ///
    /// # Errors
    /// - [`RoomError::InvalidMaxPlayers`] if `max_players` is 0 or above the limit
    /// - [`RoomError::CodeExhausted`] if no unused code turns up
    pub fn create_room(
        &mut self,
        host: Seat,
        sender: PlayerSender,
        max_players: Option<usize>,
    ) -> Result<(RoomHandle, RoomSnapshot), RoomError> {
        self.create_room_with(host, sender, max_players, generate_code)
    }

    /// [`create_room`](Self::create_room) with a custom code source.
    pub fn create_room_with(
        &mut self,
        host: Seat,
        sender: PlayerSender,
        max_players: Option<usize>,
        next_code: impl FnMut() -> RoomCode,
    ) -> Result<(RoomHandle, RoomSnapshot), RoomError> {
        let max_players = max_players.unwrap_or(self.config.default_max_players);
        let limit = self.config.max_players_limit;
        if max_players == 0 || max_players > limit {
            return Err(RoomError::InvalidMaxPlayers {
                requested: max_players,
                limit,
            });
        }

        let room_code = self.allocate_code(next_code)?;
        let room_id = RoomId(self.next_room_id);
        self.next_room_id += 1;

        let now = tokio::time::Instant::now().into_std();
        let room = Room::new(
            room_id,
            room_code.clone(),
            host,
            max_players,
            &self.config,
            now,
        );
        let snapshot = room.snapshot();
        let handle = spawn_room(room, sender, self.config.channel_size);

        self.codes.insert(room_code.clone(), room_id);
        self.rooms.insert(room_id, handle.clone());
        tracing::info!(%room_id, %room_code, max_players, "room created");
        Ok((handle, snapshot))
    }

    fn allocate_code(&self, mut next_code: impl FnMut() -> RoomCode) -> Result<RoomCode, RoomError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = next_code();
            if !self.codes.contains_key(&code) {
                return Ok(code);
            }
        }
        tracing::error!(
            rooms = self.rooms.len(),
            attempts = MAX_CODE_ATTEMPTS,
            "room code space exhausted"
        );
        Err(RoomError::CodeExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    /// Looks up a live room by its join code.
    pub fn resolve(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.codes
            .get(code)
            .and_then(|room_id| self.rooms.get(room_id))
            .cloned()
            .ok_or_else(|| RoomError::CodeNotFound(code.clone()))
    }

    pub fn get(&self, room_id: RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(&room_id)
            .cloned()
            .ok_or(RoomError::NotFound(room_id))
    }

    /// Unregisters a room and stops its actor. Removing a room that is
    /// already gone is a no-op that returns `None`.
    pub fn destroy(&mut self, room_id: RoomId) -> Option<RoomHandle> {
        let handle = self.rooms.remove(&room_id)?;
        self.codes.remove(handle.room_code());
        handle.shutdown();
        tracing::info!(%room_id, room_code = %handle.room_code(), "room destroyed");
        Some(handle)
    }

    /// Handles to every registered room, for sweeps and listings.
    pub fn handles(&self) -> Vec<RoomHandle> {
        self.rooms.values().cloned().collect()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use rally_protocol::PlayerId;
    use rally_transport::ConnectionId;
    use tokio::sync::mpsc;

    use super::*;

    fn seat(id: &str) -> Seat {
        Seat {
            player_id: PlayerId::new(id),
            display_name: id.to_uppercase(),
            connection_id: Some(ConnectionId::new(1)),
        }
    }

    fn sender() -> PlayerSender {
        mpsc::unbounded_channel().0
    }

    fn code(s: &str) -> RoomCode {
        RoomCode::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_create_room_assigns_sequential_ids() {
        let mut registry = RoomRegistry::default();
        let (first, _) = registry.create_room(seat("a"), sender(), None).unwrap();
        let (second, _) = registry.create_room(seat("b"), sender(), None).unwrap();

        assert_eq!(first.room_id(), RoomId(1));
        assert_eq!(second.room_id(), RoomId(2));
        assert_ne!(first.room_code(), second.room_code());
        assert_eq!(registry.room_count(), 2);
    }

    #[tokio::test]
    async fn test_create_room_snapshot_has_host_only() {
        let mut registry = RoomRegistry::default();
        let (_, snapshot) = registry.create_room(seat("a"), sender(), Some(4)).unwrap();

        assert_eq!(snapshot.host_id, PlayerId::new("a"));
        assert_eq!(snapshot.max_players, 4);
        assert_eq!(snapshot.players.len(), 1);
    }

    #[tokio::test]
    async fn test_create_room_rejects_bad_capacity() {
        let mut registry = RoomRegistry::default();
        for bad in [0, 17] {
            let err = registry
                .create_room(seat("a"), sender(), Some(bad))
                .unwrap_err();
            assert!(matches!(err, RoomError::InvalidMaxPlayers { .. }));
        }
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn test_create_room_retries_on_collision() {
        let mut registry = RoomRegistry::default();
        registry
            .create_room_with(seat("a"), sender(), None, || code("AAAAAA"))
            .unwrap();

        let mut draws = vec![code("BBBBBB"), code("AAAAAA"), code("AAAAAA")];
        let (handle, _) = registry
            .create_room_with(seat("b"), sender(), None, || draws.pop().unwrap())
            .unwrap();
        assert_eq!(handle.room_code(), &code("BBBBBB"));
    }

    #[tokio::test]
    async fn test_create_room_code_exhausted() {
        let mut registry = RoomRegistry::default();
        registry
            .create_room_with(seat("a"), sender(), None, || code("AAAAAA"))
            .unwrap();

        let mut draws = 0;
        let err = registry
            .create_room_with(seat("b"), sender(), None, || {
                draws += 1;
                code("AAAAAA")
            })
            .unwrap_err();
        assert!(matches!(err, RoomError::CodeExhausted { attempts: 32 }));
        assert_eq!(draws, MAX_CODE_ATTEMPTS);
        assert_eq!(registry.room_count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_finds_room_by_code() {
        let mut registry = RoomRegistry::default();
        let (handle, _) = registry.create_room(seat("a"), sender(), None).unwrap();

        let found = registry.resolve(handle.room_code()).unwrap();
        assert_eq!(found.room_id(), handle.room_id());

        let err = registry.resolve(&code("ZZZZZZ")).unwrap_err();
        assert!(matches!(err, RoomError::CodeNotFound(_)));
    }

    #[tokio::test]
    async fn test_destroy_releases_code_and_is_idempotent() {
        let mut registry = RoomRegistry::default();
        let (handle, _) = registry
            .create_room_with(seat("a"), sender(), None, || code("CCCCCC"))
            .unwrap();

        assert!(registry.destroy(handle.room_id()).is_some());
        assert!(registry.destroy(handle.room_id()).is_none());
        assert!(registry.resolve(&code("CCCCCC")).is_err());
        assert!(matches!(
            registry.get(handle.room_id()),
            Err(RoomError::NotFound(_))
        ));

        // The freed code can be handed out again.
        registry
            .create_room_with(seat("b"), sender(), None, || code("CCCCCC"))
            .unwrap();
    }
}
