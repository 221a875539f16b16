use thiserror::Error;

/// Errors raised while talking to the event stream.
///
/// None of these are fatal to the client: each one ends the current
/// connection attempt and leads to a reconnect wait.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The endpoint is not a usable event-stream URL.
    #[error("Invalid stream endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// The connection could not be established.
    #[error("Failed to connect to lyric stream: {0}")]
    Connect(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Lyric stream returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// The response body failed mid-stream.
    #[error("Lyric stream read failed: {0}")]
    Body(#[source] reqwest::Error),
}

/// A `data:` payload that could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Convenience type alias for Results with `StreamError`.
pub type Result<T> = std::result::Result<T, StreamError>;
