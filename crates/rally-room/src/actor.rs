//! Room actor: one Tokio task owns one [`Room`].
//!
//! Every read-check-write on a room happens inside its actor, one command
//! at a time. That is what makes compound rules (capacity, "all ready",
//! "everyone finished", "still empty?") safe without any locks: nothing
//! can interleave between the check and the mutation.

use std::time::Duration;

use rally_protocol::{PlayerId, RoomCode, RoomId, RoomSnapshot};
use rally_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{
    Broadcaster, Departure, JoinKind, PlayerSender, ReclaimReason, Room, RoomError, Seat,
};

/// Reply to a successful join.
#[derive(Debug, Clone)]
pub struct JoinReceipt {
    pub kind: JoinKind,
    pub room: RoomSnapshot,
}

/// Commands sent to a room actor through its channel.
///
/// Variants with a `reply` are request/response; score and finish reports
/// are fire-and-forget.
pub(crate) enum RoomCommand {
    Join {
        seat: Seat,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<JoinReceipt, RoomError>>,
    },

    SetReady {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<bool, RoomError>>,
    },

    Start {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    SetDifficulty {
        player_id: PlayerId,
        difficulty: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    UpdateScore {
        player_id: PlayerId,
        score: u64,
        lives: Option<u32>,
    },

    Finish {
        player_id: PlayerId,
        final_score: u64,
    },

    Depart {
        player_id: PlayerId,
        connection_id: Option<ConnectionId>,
        reply: oneshot::Sender<Option<Departure>>,
    },

    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },

    /// Closes the room if it is eligible right now. The actor stops
    /// after replying `Some`.
    TryReclaim {
        ttl: Duration,
        reply: oneshot::Sender<Option<ReclaimReason>>,
    },

    Shutdown,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    room_id: RoomId,
    room_code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl std::fmt::Debug for RoomCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Join { .. } => "Join",
            Self::SetReady { .. } => "SetReady",
            Self::Start { .. } => "Start",
            Self::SetDifficulty { .. } => "SetDifficulty",
            Self::UpdateScore { .. } => "UpdateScore",
            Self::Finish { .. } => "Finish",
            Self::Depart { .. } => "Depart",
            Self::Snapshot { .. } => "Snapshot",
            Self::TryReclaim { .. } => "TryReclaim",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    /// `false` once the actor has stopped.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    async fn tell(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Joins or rebinds `seat`, attaching `sender` for broadcasts.
    pub async fn join(&self, seat: Seat, sender: PlayerSender) -> Result<JoinReceipt, RoomError> {
        self.request(|reply| RoomCommand::Join {
            seat,
            sender,
            reply,
        })
        .await?
    }

    pub async fn set_ready(&self, player_id: PlayerId) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::SetReady { player_id, reply })
            .await?
    }

    pub async fn start(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start { player_id, reply })
            .await?
    }

    pub async fn set_difficulty(
        &self,
        player_id: PlayerId,
        difficulty: String,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::SetDifficulty {
            player_id,
            difficulty,
            reply,
        })
        .await?
    }

    /// Fire-and-forget score report.
    pub async fn update_score(
        &self,
        player_id: PlayerId,
        score: u64,
        lives: Option<u32>,
    ) -> Result<(), RoomError> {
        self.tell(RoomCommand::UpdateScore {
            player_id,
            score,
            lives,
        })
        .await
    }

    /// Fire-and-forget game-over report.
    pub async fn finish(&self, player_id: PlayerId, final_score: u64) -> Result<(), RoomError> {
        self.tell(RoomCommand::Finish {
            player_id,
            final_score,
        })
        .await
    }

    /// Departs `player_id`. With a `connection_id`, only if that is still
    /// the player's current connection.
    pub async fn depart(
        &self,
        player_id: PlayerId,
        connection_id: Option<ConnectionId>,
    ) -> Result<Option<Departure>, RoomError> {
        self.request(|reply| RoomCommand::Depart {
            player_id,
            connection_id,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Asks the room to close itself if it is empty or older than `ttl`.
    /// A room that already stopped reports `Unavailable`.
    pub async fn try_reclaim(&self, ttl: Duration) -> Result<Option<ReclaimReason>, RoomError> {
        self.request(|reply| RoomCommand::TryReclaim { ttl, reply })
            .await
    }

    /// Best-effort stop without waiting. If the queue is full the actor
    /// still stops once every handle is dropped.
    pub fn shutdown(&self) {
        let _ = self.sender.try_send(RoomCommand::Shutdown);
    }
}

/// The actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    broadcaster: Broadcaster,
    receiver: mpsc::Receiver<RoomCommand>,
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

impl RoomActor {
    /// Processes commands until shutdown, reclamation, or every handle
    /// is dropped.
    async fn run(mut self) {
        let room_id = self.room.room_id();
        tracing::debug!(%room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            let stop = self.handle(cmd);
            let outbox = self.room.drain_outbox();
            self.broadcaster.deliver_all(&self.room, outbox);
            if stop {
                break;
            }
        }

        tracing::debug!(%room_id, "room actor stopped");
    }

    /// Applies one command. Returns `true` if the actor should stop.
    fn handle(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                seat,
                sender,
                reply,
            } => {
                let player_id = seat.player_id.clone();
                let result = self.room.join(seat).map(|kind| {
                    self.broadcaster.attach(player_id, sender);
                    JoinReceipt {
                        kind,
                        room: self.room.snapshot(),
                    }
                });
                let _ = reply.send(result);
            }
            RoomCommand::SetReady { player_id, reply } => {
                let _ = reply.send(self.room.set_ready(&player_id));
            }
            RoomCommand::Start { player_id, reply } => {
                let _ = reply.send(self.room.start(&player_id, now()));
            }
            RoomCommand::SetDifficulty {
                player_id,
                difficulty,
                reply,
            } => {
                let _ = reply.send(self.room.set_difficulty(&player_id, &difficulty));
            }
            RoomCommand::UpdateScore {
                player_id,
                score,
                lives,
            } => {
                if let Err(e) = self.room.update_score(&player_id, score, lives, now()) {
                    self.log_dropped(&player_id, "update_score", &e);
                }
            }
            RoomCommand::Finish {
                player_id,
                final_score,
            } => {
                if let Err(e) = self.room.finish_player(&player_id, final_score) {
                    self.log_dropped(&player_id, "finish_player", &e);
                }
            }
            RoomCommand::Depart {
                player_id,
                connection_id,
                reply,
            } => {
                let departure = self.room.depart(&player_id, connection_id);
                if departure.is_some() {
                    self.broadcaster.detach(&player_id);
                }
                let _ = reply.send(departure);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.snapshot());
            }
            RoomCommand::TryReclaim { ttl, reply } => {
                let reason = self.room.reclaim_reason(now(), ttl);
                if let Some(reason) = reason {
                    tracing::info!(
                        room_id = %self.room.room_id(),
                        reason = reason.as_str(),
                        "room reclaimed"
                    );
                    self.room.close(reason);
                }
                let _ = reply.send(reason);
                return reason.is_some();
            }
            RoomCommand::Shutdown => {
                tracing::info!(room_id = %self.room.room_id(), "room shutting down");
                return true;
            }
        }
        false
    }

    fn log_dropped(&self, player_id: &PlayerId, command: &str, error: &RoomError) {
        match error {
            RoomError::AdmissionRejected { score, ceiling, .. } => tracing::warn!(
                room_id = %self.room.room_id(),
                %player_id,
                score,
                ceiling,
                "implausible score dropped"
            ),
            other => tracing::debug!(
                room_id = %self.room.room_id(),
                %player_id,
                command,
                error = %other,
                "fire-and-forget command ignored"
            ),
        }
    }
}

/// Spawns an actor owning `room`, with `host_sender` attached for the host,
/// and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub(crate) fn spawn_room(
    room: Room,
    host_sender: PlayerSender,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size.max(1));

    let mut broadcaster = Broadcaster::new();
    broadcaster.attach(room.host_id().clone(), host_sender);

    let handle = RoomHandle {
        room_id: room.room_id(),
        room_code: room.room_code().clone(),
        sender: tx,
    };

    let actor = RoomActor {
        room,
        broadcaster,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    handle
}
