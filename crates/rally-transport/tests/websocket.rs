//! Integration tests for the WebSocket transport.
//!
//! A real listener and a `tokio-tungstenite` client exchange frames over
//! loopback, so these cover the upgrade path and the liveness bookkeeping
//! together.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use rally_transport::{Connection, Transport, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect_client(addr: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws
    }

    async fn pair() -> (rally_transport::WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let client = connect_client(&addr).await;
        let conn = server.await.expect("accept task");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_send_and_recv_binary() {
        let (conn, mut client) = pair().await;

        conn.send(b"hello client").await.expect("server send");
        let msg = client.next().await.unwrap().expect("client recv");
        assert_eq!(msg.into_data().as_ref(), b"hello client");

        client
            .send(Message::Binary(b"hello server".to_vec().into()))
            .await
            .expect("client send");
        let data = conn.recv().await.expect("server recv");
        assert_eq!(data.as_deref(), Some(&b"hello server"[..]));
    }

    #[tokio::test]
    async fn test_websocket_recv_accepts_text_frames() {
        let (conn, mut client) = pair().await;

        client
            .send(Message::Text("{\"a\":1}".into()))
            .await
            .expect("client send");
        let data = conn.recv().await.expect("recv").expect("some data");
        assert_eq!(data, b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_close() {
        let (conn, mut client) = pair().await;

        client.close(None).await.expect("client close");
        let data = conn.recv().await.expect("clean close");
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_websocket_connection_ids_are_unique() {
        let (a, _ca) = pair().await;
        let (b, _cb) = pair().await;
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_websocket_ping_frames_reset_idle_time() {
        let (conn, mut client) = pair().await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(conn.idle_for() >= Duration::from_millis(50));

        // A ping from the client is consumed internally but still counts
        // as activity; the binary frame after it lets recv return.
        client
            .send(Message::Ping(Vec::new().into()))
            .await
            .expect("client ping");
        client
            .send(Message::Binary(vec![1].into()))
            .await
            .expect("client send");
        conn.recv().await.expect("recv").expect("data");

        assert!(conn.idle_for() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_websocket_server_ping_reaches_client() {
        let (conn, mut client) = pair().await;

        conn.ping().await.expect("ping");
        let msg = client.next().await.unwrap().expect("client recv");
        assert!(matches!(msg, Message::Ping(_)));
    }
}
