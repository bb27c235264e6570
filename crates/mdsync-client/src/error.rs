use thiserror::Error;

/// Transport failures of the sync channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("invalid server address: {0}")]
    Address(String),
    #[error("connection timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("connection closed")]
    Closed,
}
