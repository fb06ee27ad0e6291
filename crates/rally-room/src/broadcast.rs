//! Delivery of room events to attached players.

use std::collections::HashMap;

use rally_protocol::{Payload, PlayerId};
use tokio::sync::mpsc;

use crate::{Broadcast, Room};

/// Channel for delivering outbound payloads to one connection handler.
///
/// Unbounded so a room actor never waits on a slow socket; the handler
/// drains it as fast as the network allows.
pub type PlayerSender = mpsc::UnboundedSender<Payload>;

/// Per-room map of player → outbound channel.
///
/// The roster a broadcast reaches is "present players with an attached
/// channel". Departing players are detached before their departure event
/// goes out, so they never receive it.
#[derive(Debug, Default)]
pub struct Broadcaster {
    senders: HashMap<PlayerId, PlayerSender>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches (or replaces) the channel for `player_id`.
    pub fn attach(&mut self, player_id: PlayerId, sender: PlayerSender) {
        self.senders.insert(player_id, sender);
    }

    pub fn detach(&mut self, player_id: &PlayerId) {
        self.senders.remove(player_id);
    }

    /// Pushes one broadcast to every present, attached player it targets.
    /// Returns how many channels accepted it.
    pub fn deliver(&self, room: &Room, broadcast: &Broadcast) -> usize {
        let mut delivered = 0;
        for player_id in room.present_ids() {
            if !broadcast.recipient.includes(player_id) {
                continue;
            }
            // A closed channel means the handler is already gone; its
            // departure is on the way.
            let Some(sender) = self.senders.get(player_id) else {
                continue;
            };
            if sender.send(Payload::Event(broadcast.event.clone())).is_ok() {
                delivered += 1;
            }
        }
        tracing::trace!(
            room_id = %room.room_id(),
            event = broadcast.event.name(),
            delivered,
            "broadcast delivered"
        );
        delivered
    }

    /// Delivers a batch in order.
    pub fn deliver_all(&self, room: &Room, broadcasts: Vec<Broadcast>) {
        for broadcast in &broadcasts {
            self.deliver(room, broadcast);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use rally_protocol::{RoomCode, RoomEvent, RoomId};
    use rally_transport::ConnectionId;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::{RoomConfig, Seat};

    fn pid(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    fn seat(id: &str, n: u64) -> Seat {
        Seat {
            player_id: pid(id),
            display_name: id.to_uppercase(),
            connection_id: Some(ConnectionId::new(n)),
        }
    }

    fn drain(rx: &mut UnboundedReceiver<Payload>) -> Vec<&'static str> {
        let mut names = Vec::new();
        while let Ok(Payload::Event(event)) = rx.try_recv() {
            names.push(event.name());
        }
        names
    }

    /// Room with host `a` plus `b` and `c`, all attached.
    fn setup() -> (Room, Broadcaster, Vec<UnboundedReceiver<Payload>>) {
        let mut room = Room::new(
            RoomId(1),
            RoomCode::parse("QWERTY").unwrap(),
            seat("a", 1),
            8,
            &RoomConfig::default(),
            Instant::now(),
        );
        room.join(seat("b", 2)).unwrap();
        room.join(seat("c", 3)).unwrap();
        room.drain_outbox();

        let mut broadcaster = Broadcaster::new();
        let mut receivers = Vec::new();
        for id in ["a", "b", "c"] {
            let (tx, rx) = mpsc::unbounded_channel();
            broadcaster.attach(pid(id), tx);
            receivers.push(rx);
        }
        (room, broadcaster, receivers)
    }

    #[test]
    fn test_deliver_all_reaches_everyone() {
        let (mut room, broadcaster, mut rx) = setup();
        room.set_difficulty(&pid("a"), "hard").unwrap();
        let outbox = room.drain_outbox();
        broadcaster.deliver_all(&room, outbox);

        for r in &mut rx {
            assert_eq!(drain(r), vec!["difficulty_changed"]);
        }
    }

    #[test]
    fn test_deliver_all_except_skips_origin() {
        let (room, broadcaster, mut rx) = setup();
        let broadcast = Broadcast {
            recipient: rally_protocol::Recipient::AllExcept(pid("b")),
            event: RoomEvent::RoomClosed {
                reason: "test".into(),
            },
        };
        assert_eq!(broadcaster.deliver(&room, &broadcast), 2);
        assert_eq!(drain(&mut rx[0]).len(), 1);
        assert!(drain(&mut rx[1]).is_empty());
        assert_eq!(drain(&mut rx[2]).len(), 1);
    }

    #[test]
    fn test_deliver_skips_departed_player() {
        let (mut room, mut broadcaster, mut rx) = setup();
        room.depart(&pid("c"), None).unwrap();
        broadcaster.detach(&pid("c"));
        let outbox = room.drain_outbox();
        broadcaster.deliver_all(&room, outbox);

        assert_eq!(drain(&mut rx[0]), vec!["player_left", "roster_updated"]);
        assert!(drain(&mut rx[2]).is_empty());
    }

    #[test]
    fn test_deliver_ignores_closed_channel() {
        let (room, broadcaster, mut rx) = setup();
        rx.remove(1);
        let broadcast = Broadcast {
            recipient: rally_protocol::Recipient::All,
            event: RoomEvent::RoomClosed {
                reason: "test".into(),
            },
        };
        assert_eq!(broadcaster.deliver(&room, &broadcast), 2);
    }
}
