/*
[INPUT]:  Failures from connecting, sending, decoding and shutdown
[OUTPUT]: StreamError taxonomy for the streaming core
[POS]:    WebSocket layer - error types
[UPDATE]: When adding new failure modes to the stream session
*/

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Connect or reconnect failed; retried by the session while it is active
    #[error("connection failed: {0}")]
    Connection(String),

    /// Attempted to send without a live transport
    #[error("send failed: {0}")]
    Send(String),

    /// Inbound payload could not be decoded
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("invalid stream configuration: {0}")]
    Config(String),

    /// The session was shut down
    #[error("stream session has been shut down")]
    Shutdown,
}

impl StreamError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StreamError::Connection(_) | StreamError::Send(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        StreamError::Connection(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
