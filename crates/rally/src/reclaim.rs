//! Periodic room reclamation.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::Lobby;

/// Sweeps `lobby` every `every`. A sweep that overruns the interval makes
/// the next tick fire late rather than twice.
pub fn spawn_reclaimer(lobby: Arc<Lobby>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::debug!(interval_secs = every.as_secs(), "reclaimer started");

        loop {
            ticker.tick().await;
            let reclaimed = lobby.sweep().await;
            if reclaimed > 0 {
                tracing::info!(reclaimed, "reclamation sweep");
            } else {
                tracing::trace!("reclamation sweep found nothing");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use rally_protocol::{Command, CommandFrame, PlayerId};
    use rally_room::RoomConfig;
    use rally_transport::ConnectionId;
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reclaimer_removes_expired_room() {
        let lobby = Arc::new(Lobby::new(RoomConfig {
            ttl: Duration::from_secs(60),
            ..RoomConfig::default()
        }));
        let (tx, _rx) = mpsc::unbounded_channel();
        let frame = CommandFrame {
            request_id: 1,
            command: Command::CreateRoom {
                player_id: PlayerId::new("a"),
                display_name: "Ann".into(),
                max_players: None,
            },
        };
        lobby.handle(ConnectionId::new(1), &tx, frame).await;

        let task = spawn_reclaimer(Arc::clone(&lobby), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(lobby.counts().await.rooms, 1);

        tokio::time::sleep(Duration::from_secs(50)).await;
        assert_eq!(lobby.counts().await.rooms, 0);

        task.abort();
    }
}
