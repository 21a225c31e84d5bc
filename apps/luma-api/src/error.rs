//! Errors of the API server.

/// Error raised while configuring or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// `PORT` is not a valid port number.
    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    /// I/O failure on the listening socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A response body could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
