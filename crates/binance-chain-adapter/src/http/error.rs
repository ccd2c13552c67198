/*
[INPUT]:  Error sources (HTTP transport, non-2xx responses, serialization, URLs)
[OUTPUT]: Structured REST error type with retry hints
[POS]:    Error handling layer - REST request errors
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Error returned by every REST call.
#[derive(Error, Debug)]
pub enum BinanceChainError {
    /// Network, timeout, or body decoding failure inside reqwest
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response; `body` is the raw response text
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BinanceChainError {
    /// Check if the error is worth retrying by the caller.
    ///
    /// The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            BinanceChainError::Http(err) => err.is_timeout() || err.is_connect(),
            BinanceChainError::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            _ => false,
        }
    }

    /// HTTP status carried by the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            BinanceChainError::Api { status, .. } => Some(*status),
            BinanceChainError::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Create an API error from status code and raw body
    pub fn api_error(status: StatusCode, body: impl Into<String>) -> Self {
        BinanceChainError::Api {
            status: status.as_u16(),
            body: body.into(),
        }
    }
}

/// Result type alias for REST operations
pub type Result<T> = std::result::Result<T, BinanceChainError>;
