//! The room state machine.
//!
//! [`Room`] is plain data plus methods: no channels, no clock, no I/O.
//! Every operation takes the current `Instant` where time matters and
//! queues the events it produces in an outbox, which the owning actor
//! drains and delivers after each command. That keeps every rule here
//! testable without a runtime.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rally_protocol::{
    LeaderboardEntry, PlayerId, PlayerSnapshot, PlayerStatus, Ranking, Recipient, RoomCode,
    RoomEvent, RoomId, RoomSnapshot, RoomStatus,
};
use rally_transport::ConnectionId;

use crate::{AdmissionGuard, RoomConfig, RoomError};

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One roster entry. Never removed while the room exists.
#[derive(Debug, Clone)]
pub struct Player {
    pub player_id: PlayerId,
    /// The live connection speaking for this player, if any.
    pub connection_id: Option<ConnectionId>,
    pub display_name: String,
    pub is_host: bool,
    pub is_ready: bool,
    pub score: u64,
    pub lives: u32,
    pub status: PlayerStatus,
    /// Took part in the current match; only these are ranked.
    pub in_match: bool,
}

impl Player {
    fn new(player_id: PlayerId, display_name: String, connection_id: Option<ConnectionId>) -> Self {
        Self {
            player_id,
            connection_id,
            display_name,
            is_host: false,
            is_ready: false,
            score: 0,
            lives: 0,
            status: PlayerStatus::Waiting,
            in_match: false,
        }
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            player_id: self.player_id.clone(),
            display_name: self.display_name.clone(),
            is_host: self.is_host,
            is_ready: self.is_ready,
            score: self.score,
            lives: self.lives,
            status: self.status,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// An event paired with its resolved delivery target.
#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    pub recipient: Recipient,
    pub event: RoomEvent,
}

impl Broadcast {
    fn new(event: RoomEvent, origin: &PlayerId) -> Self {
        Self {
            recipient: event.fanout().recipient(origin),
            event,
        }
    }
}

/// Who is taking a place in the room, and from which connection.
#[derive(Debug, Clone)]
pub struct Seat {
    pub player_id: PlayerId,
    pub display_name: String,
    pub connection_id: Option<ConnectionId>,
}

/// Whether a join added a roster entry or reattached an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Joined,
    Rebound,
}

/// Result of a departure that actually happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub player_id: PlayerId,
    /// Set when the host left and someone took over.
    pub new_host: Option<PlayerId>,
    /// No present players remain.
    pub room_empty: bool,
}

/// Why a room may be destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimReason {
    AllLeft,
    Expired,
}

impl ReclaimReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllLeft => "all players left",
            Self::Expired => "room expired",
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A lobby and its match.
#[derive(Debug)]
pub struct Room {
    room_id: RoomId,
    room_code: RoomCode,
    host_id: PlayerId,
    status: RoomStatus,
    difficulty: Option<String>,
    players: HashMap<PlayerId, Player>,
    /// Join order. Drives host migration, tie-breaks and roster order.
    order: Vec<PlayerId>,
    max_players: usize,
    starting_lives: u32,
    created_at: Instant,
    match_started_at: Option<Instant>,
    guard: AdmissionGuard,
    outbox: Vec<Broadcast>,
}

impl Room {
    /// Opens a room with the `host` seat as its sole, ready player.
    pub fn new(
        room_id: RoomId,
        room_code: RoomCode,
        host: Seat,
        max_players: usize,
        config: &RoomConfig,
        now: Instant,
    ) -> Self {
        let host_id = host.player_id;
        let name = host.display_name.trim().to_string();
        let mut host = Player::new(host_id.clone(), name, host.connection_id);
        host.is_host = true;
        host.is_ready = true;

        let mut players = HashMap::new();
        players.insert(host_id.clone(), host);

        Self {
            room_id,
            room_code,
            host_id: host_id.clone(),
            status: RoomStatus::Waiting,
            difficulty: None,
            players,
            order: vec![host_id],
            max_players,
            starting_lives: config.starting_lives,
            created_at: now,
            match_started_at: None,
            guard: AdmissionGuard::new(config.admission.clone()),
            outbox: Vec::new(),
        }
    }

    // -- Accessors --

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    pub fn host_id(&self) -> &PlayerId {
        &self.host_id
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn difficulty(&self) -> Option<&str> {
        self.difficulty.as_deref()
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// Roster size, departed players included.
    pub fn roster_len(&self) -> usize {
        self.order.len()
    }

    /// Ids of players that have not left, in join order.
    pub fn present_ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.order
            .iter()
            .filter(|id| self.players.get(*id).is_some_and(|p| p.status.is_present()))
    }

    pub fn present_count(&self) -> usize {
        self.present_ids().count()
    }

    /// Takes the events queued since the last drain.
    pub fn drain_outbox(&mut self) -> Vec<Broadcast> {
        std::mem::take(&mut self.outbox)
    }

    // -- Lobby --

    /// Adds `player_id`, or rebinds it if it is already on the roster.
    ///
    /// A rebind never grows the roster and never re-elects the host.
    /// A player who left and comes back counts against capacity again.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyStarted`] unless the room is Waiting
    /// - [`RoomError::RoomFull`] when a new or returning player has no seat
    /// - [`RoomError::NameTaken`] when another present player has the name
    /// - [`RoomError::NotFound`] once everyone has left; the room only
    ///   waits to be reclaimed
    pub fn join(&mut self, seat: Seat) -> Result<JoinKind, RoomError> {
        let Seat {
            player_id,
            display_name,
            connection_id,
        } = seat;
        if !self.status.is_joinable() {
            return Err(RoomError::AlreadyStarted(self.room_id));
        }
        if self.present_count() == 0 {
            return Err(RoomError::NotFound(self.room_id));
        }

        let existing_present = self
            .players
            .get(&player_id)
            .map(|p| p.status.is_present());
        if existing_present != Some(true) && self.present_count() >= self.max_players {
            return Err(RoomError::RoomFull(self.room_id));
        }

        let display_name = display_name.trim().to_string();
        if self.name_taken(&display_name, &player_id) {
            return Err(RoomError::NameTaken(display_name));
        }

        let kind = match self.players.get_mut(&player_id) {
            Some(player) => {
                player.connection_id = connection_id;
                player.display_name = display_name;
                player.status = PlayerStatus::Waiting;
                // The host stays implicitly ready.
                player.is_ready = player.is_host;
                JoinKind::Rebound
            }
            None => {
                self.players.insert(
                    player_id.clone(),
                    Player::new(player_id.clone(), display_name, connection_id),
                );
                self.order.push(player_id.clone());
                JoinKind::Joined
            }
        };

        tracing::info!(
            room_id = %self.room_id,
            %player_id,
            ?kind,
            players = self.present_count(),
            "player joined"
        );
        self.push_roster(&player_id);
        Ok(kind)
    }

    /// Toggles readiness and returns the new value.
    ///
    /// The host is always ready; for them this is a no-op returning `true`.
    ///
    /// # Errors
    /// [`RoomError::AlreadyStarted`] outside Waiting,
    /// [`RoomError::PlayerNotFound`] for unknown or departed players.
    pub fn set_ready(&mut self, player_id: &PlayerId) -> Result<bool, RoomError> {
        if !self.status.is_joinable() {
            return Err(RoomError::AlreadyStarted(self.room_id));
        }
        let room_id = self.room_id;
        let player = self
            .players
            .get_mut(player_id)
            .filter(|p| p.status.is_present())
            .ok_or_else(|| RoomError::PlayerNotFound(player_id.clone(), room_id))?;

        if player.is_host {
            return Ok(true);
        }

        player.is_ready = !player.is_ready;
        player.status = if player.is_ready {
            PlayerStatus::Ready
        } else {
            PlayerStatus::Waiting
        };
        let is_ready = player.is_ready;

        self.push_roster(player_id);
        Ok(is_ready)
    }

    /// Host only: Waiting → Playing.
    ///
    /// Every present player is reset to a fresh score, the configured
    /// lives and status playing.
    ///
    /// # Errors
    /// [`RoomError::NotHost`], [`RoomError::AlreadyStarted`] or
    /// [`RoomError::NotAllReady`], checked in that order.
    pub fn start(&mut self, caller: &PlayerId, now: Instant) -> Result<(), RoomError> {
        if caller != &self.host_id {
            return Err(RoomError::NotHost(caller.clone()));
        }
        if !self.status.can_transition_to(RoomStatus::Playing) {
            return Err(RoomError::AlreadyStarted(self.room_id));
        }
        let all_ready = self
            .players
            .values()
            .filter(|p| p.status.is_present() && !p.is_host)
            .all(|p| p.is_ready);
        if !all_ready {
            return Err(RoomError::NotAllReady(self.room_id));
        }

        self.status = RoomStatus::Playing;
        self.match_started_at = Some(now);
        let lives = self.starting_lives;
        for player in self.players.values_mut() {
            if player.status.is_present() {
                player.score = 0;
                player.lives = lives;
                player.status = PlayerStatus::Playing;
                player.in_match = true;
            }
        }

        tracing::info!(
            room_id = %self.room_id,
            players = self.present_count(),
            difficulty = ?self.difficulty,
            "match started"
        );
        let room = self.snapshot();
        self.outbox
            .push(Broadcast::new(RoomEvent::MatchStarted { room }, caller));
        Ok(())
    }

    /// Host only, before the match: stores the difficulty label.
    ///
    /// # Errors
    /// [`RoomError::NotHost`] or [`RoomError::AlreadyStarted`].
    pub fn set_difficulty(&mut self, caller: &PlayerId, difficulty: &str) -> Result<(), RoomError> {
        if caller != &self.host_id {
            return Err(RoomError::NotHost(caller.clone()));
        }
        if !self.status.is_joinable() {
            return Err(RoomError::AlreadyStarted(self.room_id));
        }

        let difficulty = difficulty.trim().to_string();
        self.difficulty = Some(difficulty.clone());
        tracing::debug!(room_id = %self.room_id, %difficulty, "difficulty changed");
        self.outbox.push(Broadcast::new(
            RoomEvent::DifficultyChanged { difficulty },
            caller,
        ));
        Ok(())
    }

    // -- Match --

    /// Applies a live score report if the admission guard accepts it.
    ///
    /// The leaderboard goes to everyone but the reporter.
    ///
    /// # Errors
    /// [`RoomError::NotPlaying`] outside a running match or for a player
    /// who is not playing; [`RoomError::AdmissionRejected`] for an
    /// implausible score. No state changes in either case.
    pub fn update_score(
        &mut self,
        player_id: &PlayerId,
        score: u64,
        lives: Option<u32>,
        now: Instant,
    ) -> Result<(), RoomError> {
        let started_at = match (self.status, self.match_started_at) {
            (RoomStatus::Playing, Some(at)) => at,
            _ => return Err(RoomError::NotPlaying(player_id.clone())),
        };
        let room_id = self.room_id;
        let player = self
            .players
            .get_mut(player_id)
            .ok_or_else(|| RoomError::PlayerNotFound(player_id.clone(), room_id))?;
        if player.status != PlayerStatus::Playing {
            return Err(RoomError::NotPlaying(player_id.clone()));
        }

        let elapsed = now.saturating_duration_since(started_at);
        if let Err(ceiling) = self.guard.check(score, elapsed) {
            return Err(RoomError::AdmissionRejected {
                player_id: player_id.clone(),
                score,
                ceiling,
            });
        }

        player.score = score;
        if let Some(lives) = lives {
            player.lives = lives;
        }
        let lives = player.lives;

        let leaderboard = self.leaderboard();
        self.outbox.push(Broadcast::new(
            RoomEvent::ScoreLeaderboard {
                player_id: player_id.clone(),
                score,
                lives,
                leaderboard,
            },
            player_id,
        ));
        Ok(())
    }

    /// Records a game-over. When the last present player finishes, the
    /// room moves to Finished and the results go out, exactly once.
    ///
    /// # Errors
    /// [`RoomError::NotPlaying`] if the room or player is not playing.
    pub fn finish_player(&mut self, player_id: &PlayerId, final_score: u64) -> Result<(), RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::NotPlaying(player_id.clone()));
        }
        let room_id = self.room_id;
        let player = self
            .players
            .get_mut(player_id)
            .ok_or_else(|| RoomError::PlayerNotFound(player_id.clone(), room_id))?;
        if player.status != PlayerStatus::Playing {
            return Err(RoomError::NotPlaying(player_id.clone()));
        }

        player.status = PlayerStatus::Finished;
        player.score = final_score;
        tracing::info!(room_id = %self.room_id, %player_id, final_score, "player finished");

        self.outbox.push(Broadcast::new(
            RoomEvent::PlayerFinished {
                player_id: player_id.clone(),
                final_score,
            },
            player_id,
        ));
        self.finish_if_done(player_id);
        Ok(())
    }

    // -- Departure --

    /// The single path for leave and disconnect.
    ///
    /// `connection`, when given, must be the player's current connection;
    /// a departure from a superseded socket is ignored. Departing twice is
    /// also ignored. Returns `None` whenever nothing changed.
    pub fn depart(
        &mut self,
        player_id: &PlayerId,
        connection: Option<ConnectionId>,
    ) -> Option<Departure> {
        let player = self.players.get_mut(player_id)?;
        if !player.status.is_present() {
            return None;
        }
        if connection.is_some() && player.connection_id != connection {
            tracing::debug!(
                room_id = %self.room_id,
                %player_id,
                "ignoring departure from superseded connection"
            );
            return None;
        }

        player.status = PlayerStatus::Left;
        player.is_ready = false;
        player.connection_id = None;
        let was_host = player.is_host;

        let new_host = if was_host { self.migrate_host() } else { None };

        tracing::info!(
            room_id = %self.room_id,
            %player_id,
            new_host = ?new_host,
            players = self.present_count(),
            "player left"
        );

        self.outbox.push(Broadcast::new(
            RoomEvent::PlayerLeft {
                player_id: player_id.clone(),
                new_host: new_host.clone(),
            },
            player_id,
        ));
        self.push_roster(player_id);
        self.finish_if_done(player_id);

        Some(Departure {
            player_id: player_id.clone(),
            new_host,
            room_empty: self.present_count() == 0,
        })
    }

    /// Hands the host role to the earliest-joined present player.
    fn migrate_host(&mut self) -> Option<PlayerId> {
        let next = self.present_ids().next().cloned()?;

        if let Some(old) = self.players.get_mut(&self.host_id) {
            old.is_host = false;
        }
        if let Some(new) = self.players.get_mut(&next) {
            new.is_host = true;
            new.is_ready = true;
        }
        tracing::info!(
            room_id = %self.room_id,
            old_host = %self.host_id,
            new_host = %next,
            "host migrated"
        );
        self.host_id = next.clone();
        Some(next)
    }

    // -- Reclamation --

    /// Why this room may be destroyed now, if at all.
    ///
    /// A room with a present player is only eligible once it is older
    /// than `ttl`.
    pub fn reclaim_reason(&self, now: Instant, ttl: Duration) -> Option<ReclaimReason> {
        if self.present_count() == 0 {
            Some(ReclaimReason::AllLeft)
        } else if now.saturating_duration_since(self.created_at) > ttl {
            Some(ReclaimReason::Expired)
        } else {
            None
        }
    }

    /// Queues a room-closed notice for whoever is still attached.
    pub fn close(&mut self, reason: ReclaimReason) {
        let origin = self.host_id.clone();
        self.outbox.push(Broadcast::new(
            RoomEvent::RoomClosed {
                reason: reason.as_str().to_string(),
            },
            &origin,
        ));
    }

    // -- Views --

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id,
            room_code: self.room_code.clone(),
            host_id: self.host_id.clone(),
            status: self.status,
            difficulty: self.difficulty.clone(),
            max_players: self.max_players,
            players: self
                .order
                .iter()
                .filter_map(|id| self.players.get(id))
                .map(Player::snapshot)
                .collect(),
        }
    }

    /// Match participants by score, highest first. Ties keep join order.
    fn ranked_participants(&self) -> Vec<&Player> {
        let mut ranked: Vec<&Player> = self
            .order
            .iter()
            .filter_map(|id| self.players.get(id))
            .filter(|p| p.in_match)
            .collect();
        // `sort_by` is stable, so equal scores stay in join order.
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.ranked_participants()
            .into_iter()
            .map(|p| LeaderboardEntry {
                player_id: p.player_id.clone(),
                display_name: p.display_name.clone(),
                score: p.score,
                lives: p.lives,
                status: p.status,
            })
            .collect()
    }

    fn rankings(&self) -> Vec<Ranking> {
        self.ranked_participants()
            .into_iter()
            .enumerate()
            .map(|(i, p)| Ranking {
                rank: i + 1,
                player_id: p.player_id.clone(),
                display_name: p.display_name.clone(),
                score: p.score,
                status: p.status,
            })
            .collect()
    }

    // -- Internals --

    fn name_taken(&self, name: &str, joiner: &PlayerId) -> bool {
        let wanted = name.to_lowercase();
        self.players.values().any(|p| {
            &p.player_id != joiner
                && p.status.is_present()
                && p.display_name.to_lowercase() == wanted
        })
    }

    fn push_roster(&mut self, origin: &PlayerId) {
        let room = self.snapshot();
        self.outbox
            .push(Broadcast::new(RoomEvent::RosterUpdated { room }, origin));
    }

    /// Playing → Finished once every present player has finished.
    fn finish_if_done(&mut self, origin: &PlayerId) {
        if self.status != RoomStatus::Playing {
            return;
        }
        let mut present = self
            .players
            .values()
            .filter(|p| p.status.is_present())
            .peekable();
        if present.peek().is_none() {
            return;
        }
        if !present.all(|p| p.status == PlayerStatus::Finished) {
            return;
        }

        self.status = RoomStatus::Finished;
        let rankings = self.rankings();
        tracing::info!(
            room_id = %self.room_id,
            winner = ?rankings.first().map(|r| &r.player_id),
            "match finished"
        );
        self.outbox
            .push(Broadcast::new(RoomEvent::MatchResults { rankings }, origin));
    }
}

// =========================================================================
// Tests
// =========================================================================
