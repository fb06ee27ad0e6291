/// Errors raised while accepting, reading or writing a connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer went away while an operation was in flight.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener or accepting a TCP stream failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The TCP stream was accepted but the WebSocket upgrade did not
    /// complete.
    #[error("upgrade failed: {0}")]
    UpgradeFailed(#[source] std::io::Error),
}
