//! HTTP status surface: `/health` and `/debug/rooms`.
//!
//! Unauthenticated. Bind it to a private address.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rally_protocol::{RoomSnapshot, RoomStatus};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::Lobby;

/// Structured health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub rooms: usize,
    pub connections: usize,
    pub bindings: usize,
}

/// One row of the debug room listing.
#[derive(Debug, Serialize)]
pub struct RoomSummary {
    pub room_code: String,
    pub status: RoomStatus,
    pub players: Vec<String>,
    pub difficulty: Option<String>,
}

impl From<RoomSnapshot> for RoomSummary {
    fn from(room: RoomSnapshot) -> Self {
        let players = room
            .present_players()
            .map(|p| p.display_name.clone())
            .collect();
        Self {
            room_code: room.room_code.as_str().to_string(),
            status: room.status,
            players,
            difficulty: room.difficulty,
        }
    }
}

pub async fn health_check(State(lobby): State<Arc<Lobby>>) -> Json<HealthResponse> {
    let counts = lobby.counts().await;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        rooms: counts.rooms,
        connections: counts.connections,
        bindings: counts.bindings,
    })
}

pub async fn debug_rooms(State(lobby): State<Arc<Lobby>>) -> Json<Vec<RoomSummary>> {
    let rooms = lobby.list_rooms().await;
    Json(rooms.into_iter().map(RoomSummary::from).collect())
}

pub fn router(lobby: Arc<Lobby>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/debug/rooms", get(debug_rooms))
        .with_state(lobby)
}

/// Serves the status routes on `listener` until the task is dropped.
pub async fn serve_status(listener: TcpListener, lobby: Arc<Lobby>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "status surface listening");
    }
    axum::serve(listener, router(lobby)).await
}

#[cfg(test)]
mod tests {
    use rally_protocol::{Command, CommandFrame, PlayerId};
    use rally_transport::ConnectionId;
    use tokio::sync::mpsc;

    use super::*;

    async fn lobby_with_room() -> Arc<Lobby> {
        let lobby = Arc::new(Lobby::default());
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
        lobby
    }

    #[tokio::test]
    async fn test_health_check_reports_counts() {
        let lobby = lobby_with_room().await;
        let Json(health) = health_check(State(lobby)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.rooms, 1);
        assert_eq!(health.bindings, 1);
        assert_eq!(health.connections, 0);
    }

    #[tokio::test]
    async fn test_debug_rooms_lists_players() {
        let lobby = lobby_with_room().await;
        let Json(rooms) = debug_rooms(State(lobby)).await;
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].players, vec!["Ann".to_string()]);
        assert_eq!(rooms[0].status, RoomStatus::Waiting);
        assert_eq!(rooms[0].difficulty, None);
    }

    #[test]
    fn test_health_response_serializes() {
        let resp = HealthResponse {
            status: "ok",
            version: "0.1.0",
            rooms: 2,
            connections: 3,
            bindings: 4,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["rooms"], 2);
        assert_eq!(json["bindings"], 4);
    }
}
