//! Error types for SSE client operations

use thiserror::Error;

/// Result type alias for SSE client operations
pub type Result<T> = std::result::Result<T, SseClientError>;

/// Errors that can occur while opening or consuming an event stream
#[derive(Error, Debug)]
pub enum SseClientError {
    /// HTTP request failed (connect, TLS, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A configured header name or value could not be encoded
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Server answered with a non-success status
    #[error("Server returned {status} {reason}: {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    /// The connection dropped before the server finished the stream
    #[error("Stream disconnected: {0}")]
    Disconnected(String),

    /// A line was not valid UTF-8 (only surfaced in strict mode)
    #[error("Invalid UTF-8 in event stream: {0}")]
    Decode(#[from] std::str::Utf8Error),
}

impl SseClientError {
    /// Create a status error from a status code, reason phrase and body
    pub fn status(status: u16, reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }

    /// Whether this error came from the transport rather than from decoding.
    ///
    /// Transport errors are the ones a caller may answer by reconnecting with
    /// the last seen event id.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Io(_) | Self::Status { .. } | Self::Disconnected(_)
        )
    }
}
