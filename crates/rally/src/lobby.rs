//! Command dispatch without any socket in sight.
//!
//! [`Lobby`] owns the room registry and the binding table. The connection
//! handler decodes a frame, hands the command here, and writes back
//! whatever ack comes out. Everything in between is testable with plain
//! channels.

use std::sync::atomic::{AtomicUsize, Ordering};

use rally_protocol::{
    Ack, AckBody, Command, CommandFrame, PlayerId, RoomCode, RoomId, RoomSnapshot,
};
use rally_room::{Departure, PlayerSender, RoomConfig, RoomError, RoomHandle, RoomRegistry, Seat};
use rally_session::{BindingTable, SessionError};
use rally_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::RallyError;

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

/// Shared coordinator state: every room plus every connection binding.
///
/// Locks are held only for map operations, never across an await on a
/// room actor.
pub struct Lobby {
    rooms: Mutex<RoomRegistry>,
    bindings: Mutex<BindingTable>,
    connections: AtomicUsize,
}

/// Gauges for the health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LobbyCounts {
    pub rooms: usize,
    pub connections: usize,
    pub bindings: usize,
}

impl Lobby {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: Mutex::new(RoomRegistry::new(config)),
            bindings: Mutex::new(BindingTable::new()),
            connections: AtomicUsize::new(0),
        }
    }

    // -- Dispatch --

    /// Runs one command for `conn`.
    ///
    /// Returns the ack to send back, or `None` for fire-and-forget
    /// commands. `sender` is the connection's outbound channel, attached to
    /// the room on create and join.
    pub async fn handle(
        &self,
        conn: ConnectionId,
        sender: &PlayerSender,
        frame: CommandFrame,
    ) -> Option<Ack> {
        let CommandFrame {
            request_id,
            command,
        } = frame;
        let name = command.name();
        let expects_ack = command.expects_ack();

        let result = match command.validate() {
            Ok(()) => self.dispatch(conn, sender, command).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(Some(body)) => Some(Ack::ok(request_id, body)),
            Ok(None) => None,
            Err(e) if expects_ack => {
                tracing::debug!(%conn, command = name, error = %e, "command failed");
                Some(Ack::failed(request_id, e.to_error_body()))
            }
            Err(e) => {
                tracing::debug!(%conn, command = name, error = %e, "fire-and-forget command dropped");
                None
            }
        }
    }

    /// `Ok(None)` means the command succeeded and gets no ack.
    async fn dispatch(
        &self,
        conn: ConnectionId,
        sender: &PlayerSender,
        command: Command,
    ) -> Result<Option<AckBody>, RallyError> {
        let body = match command {
            Command::CreateRoom {
                player_id,
                display_name,
                max_players,
            } => {
                self.create_room(conn, sender, player_id, display_name, max_players)
                    .await?
            }
            Command::JoinRoom {
                room_code,
                player_id,
                display_name,
            } => {
                let code = RoomCode::parse(&room_code)?;
                self.join_room(conn, sender, code, player_id, display_name)
                    .await?
            }
            Command::SetReady => {
                let (handle, player_id) = self.bound(conn).await?;
                let is_ready = handle.set_ready(player_id).await?;
                AckBody::Ready { is_ready }
            }
            Command::StartMatch => {
                let (handle, player_id) = self.bound(conn).await?;
                handle.start(player_id).await?;
                AckBody::Started
            }
            Command::SetDifficulty { difficulty } => {
                let (handle, player_id) = self.bound(conn).await?;
                handle.set_difficulty(player_id, difficulty).await?;
                AckBody::DifficultySet
            }
            Command::UpdateScore { score, lives } => {
                let (handle, player_id) = self.bound(conn).await?;
                handle.update_score(player_id, score, lives).await?;
                return Ok(None);
            }
            Command::FinishPlayer { final_score } => {
                let (handle, player_id) = self.bound(conn).await?;
                handle.finish(player_id, final_score).await?;
                return Ok(None);
            }
            Command::LeaveRoom => {
                self.depart(conn).await;
                AckBody::Left
            }
            Command::QueryRoomState => {
                let (handle, _) = self.bound(conn).await?;
                let room = handle.snapshot().await?;
                AckBody::RoomState { room }
            }
        };
        Ok(Some(body))
    }

    // -- Commands --

    async fn create_room(
        &self,
        conn: ConnectionId,
        sender: &PlayerSender,
        player_id: PlayerId,
        display_name: String,
        max_players: Option<usize>,
    ) -> Result<AckBody, RallyError> {
        self.ensure_can_bind(conn, None).await?;

        let seat = Seat {
            player_id: player_id.clone(),
            display_name,
            connection_id: Some(conn),
        };
        let (handle, room) = self
            .rooms
            .lock()
            .await
            .create_room(seat, sender.clone(), max_players)?;
        let room_id = handle.room_id();

        let bound = self
            .bindings
            .lock()
            .await
            .bind(conn, room_id, player_id, now());
        if let Err(e) = bound {
            self.rooms.lock().await.destroy(room_id);
            return Err(e.into());
        }

        tracing::info!(%conn, %room_id, room_code = %handle.room_code(), "room opened");
        Ok(AckBody::RoomCreated {
            room_id,
            room_code: handle.room_code().clone(),
            room,
        })
    }

    async fn join_room(
        &self,
        conn: ConnectionId,
        sender: &PlayerSender,
        code: RoomCode,
        player_id: PlayerId,
        display_name: String,
    ) -> Result<AckBody, RallyError> {
        let handle = self.rooms.lock().await.resolve(&code)?;
        let room_id = handle.room_id();
        self.ensure_can_bind(conn, Some((room_id, &player_id))).await?;

        let seat = Seat {
            player_id: player_id.clone(),
            display_name,
            connection_id: Some(conn),
        };
        // A room that stopped or emptied between resolve and join looks
        // like one that never existed.
        let receipt = handle
            .join(seat, sender.clone())
            .await
            .map_err(|e| match e {
                RoomError::Unavailable(_) | RoomError::NotFound(_) => {
                    RoomError::CodeNotFound(code.clone())
                }
                other => other,
            })?;

        let bound = self
            .bindings
            .lock()
            .await
            .bind(conn, room_id, player_id.clone(), now());
        match bound {
            Ok(Some(displaced)) => {
                tracing::info!(%conn, %displaced, %room_id, %player_id, "session taken over");
            }
            Ok(None) => {}
            Err(e) => {
                match handle.depart(player_id, Some(conn)).await {
                    Ok(Some(departure)) => {
                        self.settle(&handle, &departure).await;
                    }
                    Ok(None) => {}
                    Err(undo) => {
                        tracing::warn!(%conn, %room_id, error = %undo, "join rollback failed");
                    }
                }
                return Err(e.into());
            }
        }

        Ok(AckBody::RoomJoined {
            room_id,
            room: receipt.room,
        })
    }

    /// Leave and disconnect share this path. Idempotent: once the binding
    /// is gone there is nothing left to do.
    async fn depart(&self, conn: ConnectionId) -> Option<Departure> {
        let binding = self.bindings.lock().await.unbind(conn)?;
        let room_id = binding.room_id;
        let handle = self.rooms.lock().await.get(room_id).ok()?;

        let departure = match handle.depart(binding.player_id, Some(conn)).await {
            Ok(departure) => departure?,
            Err(e) => {
                tracing::debug!(%conn, %room_id, error = %e, "departure from a stopped room");
                return None;
            }
        };

        self.settle(&handle, &departure).await;
        Some(departure)
    }

    /// Drops whatever `conn` was bound to. Safe to call more than once.
    pub async fn disconnect(&self, conn: ConnectionId) {
        if let Some(departure) = self.depart(conn).await {
            tracing::debug!(%conn, player_id = %departure.player_id, "disconnect handled");
        }
    }

    // -- Reclamation --

    /// Closes the room right away if `departure` emptied it.
    async fn settle(&self, handle: &RoomHandle, departure: &Departure) {
        if departure.room_empty {
            self.reclaim(handle).await;
        }
    }

    /// Asks the room to close itself and, if it did, forgets it.
    async fn reclaim(&self, handle: &RoomHandle) -> bool {
        let ttl = self.rooms.lock().await.config().ttl;
        match handle.try_reclaim(ttl).await {
            Ok(Some(_)) | Err(_) => {
                self.forget(handle.room_id()).await;
                true
            }
            Ok(None) => false,
        }
    }

    async fn forget(&self, room_id: RoomId) {
        self.rooms.lock().await.destroy(room_id);
        let purged = self.bindings.lock().await.purge_room(room_id);
        if !purged.is_empty() {
            tracing::debug!(%room_id, connections = purged.len(), "bindings purged");
        }
    }

    /// One reclamation pass. Every room decides inside its own actor
    /// whether it is empty or expired; the ones that closed are removed
    /// afterwards. Returns how many rooms went away.
    pub async fn sweep(&self) -> usize {
        let (handles, ttl) = {
            let rooms = self.rooms.lock().await;
            (rooms.handles(), rooms.config().ttl)
        };

        let mut candidates = Vec::new();
        for handle in &handles {
            match handle.try_reclaim(ttl).await {
                Ok(Some(_)) => candidates.push(handle.room_id()),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(room_id = %handle.room_id(), error = %e, "dead room actor");
                    candidates.push(handle.room_id());
                }
            }
        }

        for &room_id in &candidates {
            self.forget(room_id).await;
        }
        candidates.len()
    }

    // -- Views --

    /// Snapshots of every live room, ordered by id.
    pub async fn list_rooms(&self) -> Vec<RoomSnapshot> {
        let handles = self.rooms.lock().await.handles();
        let mut rooms = Vec::with_capacity(handles.len());
        for handle in &handles {
            if let Ok(room) = handle.snapshot().await {
                rooms.push(room);
            }
        }
        rooms.sort_by_key(|r| r.room_id);
        rooms
    }

    pub async fn counts(&self) -> LobbyCounts {
        LobbyCounts {
            rooms: self.rooms.lock().await.room_count(),
            connections: self.connections.load(Ordering::Relaxed),
            bindings: self.bindings.lock().await.len(),
        }
    }

    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }

    // -- Internals --

    /// The room and player behind a bound connection.
    async fn bound(&self, conn: ConnectionId) -> Result<(RoomHandle, PlayerId), RallyError> {
        let (room_id, player_id) = {
            let bindings = self.bindings.lock().await;
            let binding = bindings.require(conn)?;
            (binding.room_id, binding.player_id.clone())
        };
        let handle = self.rooms.lock().await.get(room_id)?;
        Ok((handle, player_id))
    }

    /// Fails unless `conn` is unbound or already bound as `target`.
    ///
    /// `None` means the connection must be unbound (room creation).
    async fn ensure_can_bind(
        &self,
        conn: ConnectionId,
        target: Option<(RoomId, &PlayerId)>,
    ) -> Result<(), SessionError> {
        let bindings = self.bindings.lock().await;
        let Some(binding) = bindings.lookup(conn) else {
            return Ok(());
        };
        match target {
            Some((room_id, _)) if binding.room_id != room_id => Err(SessionError::BoundElsewhere {
                connection: conn,
                room_id: binding.room_id,
            }),
            None => Err(SessionError::BoundElsewhere {
                connection: conn,
                room_id: binding.room_id,
            }),
            Some((_, player_id)) if &binding.player_id != player_id => {
                Err(SessionError::BoundAsOther {
                    connection: conn,
                    player_id: binding.player_id.clone(),
                })
            }
            Some(_) => Ok(()),
        }
    }
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rally_protocol::{ErrorKind, Payload, RoomEvent, RoomStatus};
    use tokio::sync::mpsc;

    use super::*;

    // =====================================================================
    // Helpers
    // =====================================================================

    struct Client {
        conn: ConnectionId,
        tx: PlayerSender,
        rx: mpsc::UnboundedReceiver<Payload>,
        next_request: u64,
    }

    impl Client {
        fn new(n: u64) -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            Self {
                conn: ConnectionId::new(n),
                tx,
                rx,
                next_request: 1,
            }
        }

        async fn send(&mut self, lobby: &Lobby, command: Command) -> Option<Ack> {
            let request_id = self.next_request;
            self.next_request += 1;
            lobby
                .handle(
                    self.conn,
                    &self.tx,
                    CommandFrame {
                        request_id,
                        command,
                    },
                )
                .await
        }

        async fn ok(&mut self, lobby: &Lobby, command: Command) -> AckBody {
            let ack = self.send(lobby, command).await.unwrap();
            assert!(ack.ok, "expected ok ack, got {ack:?}");
            ack.body.unwrap()
        }

        async fn fail(&mut self, lobby: &Lobby, command: Command) -> (ErrorKind, String) {
            let ack = self.send(lobby, command).await.unwrap();
            let error = ack.error.unwrap();
            (error.kind, error.code)
        }

        fn events(&mut self) -> Vec<RoomEvent> {
            let mut out = Vec::new();
            while let Ok(payload) = self.rx.try_recv() {
                if let Payload::Event(event) = payload {
                    out.push(event);
                }
            }
            out
        }
    }

    fn create(id: &str) -> Command {
        Command::CreateRoom {
            player_id: PlayerId::new(id),
            display_name: id.to_uppercase(),
            max_players: None,
        }
    }

    fn join(code: &RoomCode, id: &str) -> Command {
        Command::JoinRoom {
            room_code: code.as_str().to_lowercase(),
            player_id: PlayerId::new(id),
            display_name: id.to_uppercase(),
        }
    }

    async fn open_room(lobby: &Lobby, host: &mut Client, id: &str) -> RoomCode {
        match host.ok(lobby, create(id)).await {
            AckBody::RoomCreated { room_code, .. } => room_code,
            other => panic!("unexpected ack body: {other:?}"),
        }
    }

    // =====================================================================
    // Create / join
    // =====================================================================

    #[tokio::test]
    async fn test_create_then_join_shares_roster() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let mut b = Client::new(2);
        let code = open_room(&lobby, &mut a, "a").await;

        match b.ok(&lobby, join(&code, "b")).await {
            AckBody::RoomJoined { room, .. } => {
                assert_eq!(room.players.len(), 2);
                assert_eq!(room.room_code, code);
            }
            other => panic!("unexpected ack body: {other:?}"),
        }

        let counts = lobby.counts().await;
        assert_eq!(counts.rooms, 1);
        assert_eq!(counts.bindings, 2);
    }

    #[tokio::test]
    async fn test_join_unknown_code_not_found() {
        let lobby = Lobby::default();
        let mut b = Client::new(2);
        let code = RoomCode::parse("ZZZZZZ").unwrap();
        let (kind, code) = b.fail(&lobby, join(&code, "b")).await;
        assert_eq!(kind, ErrorKind::NotFound);
        assert_eq!(code, "room_not_found");
    }

    #[tokio::test]
    async fn test_join_malformed_code_is_validation() {
        let lobby = Lobby::default();
        let mut b = Client::new(2);
        let (kind, _) = b
            .fail(
                &lobby,
                Command::JoinRoom {
                    room_code: "AB".into(),
                    player_id: PlayerId::new("b"),
                    display_name: "B".into(),
                },
            )
            .await;
        assert_eq!(kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_join_while_bound_elsewhere_conflicts() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let mut c = Client::new(3);
        open_room(&lobby, &mut a, "a").await;
        let other = open_room(&lobby, &mut c, "c").await;

        let (kind, code) = a.fail(&lobby, join(&other, "a")).await;
        assert_eq!(kind, ErrorKind::Conflict);
        assert_eq!(code, "bound_elsewhere");
    }

    #[tokio::test]
    async fn test_join_same_room_as_other_player_conflicts() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let code = open_room(&lobby, &mut a, "a").await;

        let (kind, err) = a.fail(&lobby, join(&code, "b")).await;
        assert_eq!(kind, ErrorKind::Conflict);
        assert_eq!(err, "bound_as_other");

        let rooms = lobby.list_rooms().await;
        assert_eq!(rooms[0].players.len(), 1);

        // Same identity again is a harmless rebind.
        a.ok(&lobby, join(&code, "a")).await;

        a.ok(&lobby, Command::LeaveRoom).await;
        lobby.disconnect(a.conn).await;
        let counts = lobby.counts().await;
        assert_eq!(counts.rooms, 0);
        assert_eq!(counts.bindings, 0);
    }

    #[tokio::test]
    async fn test_racing_joins_into_two_rooms_leave_no_stray_player() {
        let lobby = Lobby::default();
        let mut c = Client::new(3);
        let mut d = Client::new(4);
        let first = open_room(&lobby, &mut c, "c").await;
        let second = open_room(&lobby, &mut d, "d").await;

        let x = Client::new(5);
        let frame = |request_id, code: &RoomCode| CommandFrame {
            request_id,
            command: join(code, "x"),
        };
        let (one, two) = tokio::join!(
            lobby.handle(x.conn, &x.tx, frame(1, &first)),
            lobby.handle(x.conn, &x.tx, frame(2, &second)),
        );
        let (one, two) = (one.unwrap(), two.unwrap());

        assert!(one.ok ^ two.ok, "exactly one join may win: {one:?} {two:?}");
        let loser = if one.ok { two } else { one };
        assert_eq!(loser.error.unwrap().code, "bound_elsewhere");

        let present: usize = lobby
            .list_rooms()
            .await
            .iter()
            .map(|room| room.present_players().count())
            .sum();
        assert_eq!(present, 3);
        assert_eq!(lobby.counts().await.bindings, 3);
    }

    #[tokio::test]
    async fn test_join_after_start_conflicts() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let mut b = Client::new(2);
        let code = open_room(&lobby, &mut a, "a").await;
        a.ok(&lobby, Command::StartMatch).await;

        let (kind, code) = b.fail(&lobby, join(&code, "b")).await;
        assert_eq!(kind, ErrorKind::Conflict);
        assert_eq!(code, "already_started");
    }

    #[tokio::test]
    async fn test_rejoin_from_new_connection_rebinds() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let mut b = Client::new(2);
        let code = open_room(&lobby, &mut a, "a").await;
        b.ok(&lobby, join(&code, "b")).await;

        let mut b2 = Client::new(3);
        match b2.ok(&lobby, join(&code, "b")).await {
            AckBody::RoomJoined { room, .. } => assert_eq!(room.players.len(), 2),
            other => panic!("unexpected ack body: {other:?}"),
        }

        // The old socket is no longer anyone.
        let (kind, _) = b.fail(&lobby, Command::SetReady).await;
        assert_eq!(kind, ErrorKind::NotFound);
        assert_eq!(lobby.counts().await.bindings, 2);

        // And its eventual disconnect does not evict the new one.
        lobby.disconnect(b.conn).await;
        match b2.ok(&lobby, Command::QueryRoomState).await {
            AckBody::RoomState { room } => {
                assert!(room.player(&PlayerId::new("b")).unwrap().status.is_present());
            }
            other => panic!("unexpected ack body: {other:?}"),
        }
    }

    // =====================================================================
    // Bound commands
    // =====================================================================

    #[tokio::test]
    async fn test_unbound_command_not_found() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let (kind, code) = a.fail(&lobby, Command::QueryRoomState).await;
        assert_eq!(kind, ErrorKind::NotFound);
        assert_eq!(code, "not_in_room");
    }

    #[tokio::test]
    async fn test_host_only_commands_authorization() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let mut b = Client::new(2);
        let code = open_room(&lobby, &mut a, "a").await;
        b.ok(&lobby, join(&code, "b")).await;

        let (kind, _) = b.fail(&lobby, Command::StartMatch).await;
        assert_eq!(kind, ErrorKind::Authorization);
        let (kind, _) = b
            .fail(
                &lobby,
                Command::SetDifficulty {
                    difficulty: "hard".into(),
                },
            )
            .await;
        assert_eq!(kind, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_ready_start_and_score_flow() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let mut b = Client::new(2);
        let code = open_room(&lobby, &mut a, "a").await;
        b.ok(&lobby, join(&code, "b")).await;

        let (kind, code_str) = a.fail(&lobby, Command::StartMatch).await;
        assert_eq!(kind, ErrorKind::Conflict);
        assert_eq!(code_str, "not_all_ready");

        assert_eq!(
            b.ok(&lobby, Command::SetReady).await,
            AckBody::Ready { is_ready: true }
        );
        assert_eq!(a.ok(&lobby, Command::StartMatch).await, AckBody::Started);

        let none = a
            .send(
                &lobby,
                Command::UpdateScore {
                    score: 100,
                    lives: None,
                },
            )
            .await;
        assert!(none.is_none());

        // Query goes through the same actor, so the score is in by now.
        match b.ok(&lobby, Command::QueryRoomState).await {
            AckBody::RoomState { room } => {
                assert_eq!(room.status, RoomStatus::Playing);
                assert_eq!(room.player(&PlayerId::new("a")).unwrap().score, 100);
            }
            other => panic!("unexpected ack body: {other:?}"),
        }
        assert!(b
            .events()
            .iter()
            .any(|e| matches!(e, RoomEvent::ScoreLeaderboard { .. })));
    }

    #[tokio::test]
    async fn test_fire_and_forget_unbound_gets_no_ack() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let ack = a
            .send(&lobby, Command::FinishPlayer { final_score: 10 })
            .await;
        assert!(ack.is_none());
    }

    // =====================================================================
    // Leave / disconnect / reclamation
    // =====================================================================

    #[tokio::test]
    async fn test_leave_unbound_is_ok() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        assert_eq!(a.ok(&lobby, Command::LeaveRoom).await, AckBody::Left);
    }

    #[tokio::test]
    async fn test_last_leave_reclaims_room() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let code = open_room(&lobby, &mut a, "a").await;

        a.ok(&lobby, Command::LeaveRoom).await;

        let counts = lobby.counts().await;
        assert_eq!(counts.rooms, 0);
        assert_eq!(counts.bindings, 0);

        let mut b = Client::new(2);
        let (kind, _) = b.fail(&lobby, join(&code, "b")).await;
        assert_eq!(kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_host_disconnect_migrates_host() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let mut b = Client::new(2);
        let code = open_room(&lobby, &mut a, "a").await;
        b.ok(&lobby, join(&code, "b")).await;

        lobby.disconnect(a.conn).await;
        lobby.disconnect(a.conn).await;

        match b.ok(&lobby, Command::QueryRoomState).await {
            AckBody::RoomState { room } => assert_eq!(room.host_id, PlayerId::new("b")),
            other => panic!("unexpected ack body: {other:?}"),
        }
        assert_eq!(lobby.counts().await.rooms, 1);
    }

    #[tokio::test]
    async fn test_leave_then_join_other_room() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let mut c = Client::new(3);
        open_room(&lobby, &mut a, "a").await;
        let other = open_room(&lobby, &mut c, "c").await;

        a.ok(&lobby, Command::LeaveRoom).await;
        a.ok(&lobby, join(&other, "a")).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_expired_and_keeps_live() {
        let lobby = Lobby::new(RoomConfig {
            ttl: Duration::from_secs(60),
            ..RoomConfig::default()
        });
        let mut a = Client::new(1);
        open_room(&lobby, &mut a, "a").await;
        tokio::time::advance(Duration::from_secs(30)).await;
        let mut c = Client::new(3);
        open_room(&lobby, &mut c, "c").await;

        assert_eq!(lobby.sweep().await, 0);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(lobby.sweep().await, 1);

        let counts = lobby.counts().await;
        assert_eq!(counts.rooms, 1);
        assert_eq!(counts.bindings, 1);

        let closed = a.events();
        assert!(matches!(
            closed.last(),
            Some(RoomEvent::RoomClosed { .. })
        ));
        let (kind, _) = a.fail(&lobby, Command::QueryRoomState).await;
        assert_eq!(kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_rooms_sorted_by_id() {
        let lobby = Lobby::default();
        let mut a = Client::new(1);
        let mut c = Client::new(3);
        open_room(&lobby, &mut a, "a").await;
        open_room(&lobby, &mut c, "c").await;

        let rooms = lobby.list_rooms().await;
        assert_eq!(rooms.len(), 2);
        assert!(rooms[0].room_id < rooms[1].room_id);
    }
}
