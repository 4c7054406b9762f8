//! Error types for the console

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the console
#[derive(Debug, Error)]
pub enum Error {
    // Container errors (2000-2999)
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    // Auth errors (3000-3999)
    #[error("Credential rejected by backend")]
    Unauthorized,

    #[error("No credential available")]
    NotAuthenticated,

    #[error("Authentication failed: {0}")]
    SignInFailed(String),

    #[error("Invalid authentication response")]
    InvalidAuthResponse,

    // Stream errors (4000-4999)
    #[error("Not connected to logs stream")]
    StreamNotConnected,

    #[error("Socket error: {0}")]
    Socket(String),

    // Transport errors (5000-5999)
    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    // Storage errors (6000-6999)
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // General errors (1000-1999)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the error code
    pub fn code(&self) -> u32 {
        match self {
            // Container errors (2000-2999)
            Error::ContainerNotFound(_) => 2001,

            // Auth errors (3000-3999)
            Error::Unauthorized => 3001,
            Error::NotAuthenticated => 3002,
            Error::SignInFailed(_) => 3003,
            Error::InvalidAuthResponse => 3004,

            // Stream errors (4000-4999)
            Error::StreamNotConnected => 4001,
            Error::Socket(_) => 4002,

            // Transport errors (5000-5999)
            Error::Backend { .. } => 5001,
            Error::Transport(_) => 5002,
            Error::Timeout => 5003,
            Error::InvalidUrl(_) => 5004,

            // Storage errors (6000-6999)
            Error::Storage(_) => 6001,
            Error::Serialization(_) => 6002,

            // General errors (1000-1999)
            Error::Internal(_) => 1001,
        }
    }

    /// Whether the backend rejected the credential
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized)
    }

    /// Whether the request never produced a response
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout | Error::InvalidUrl(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_builder() {
            Error::InvalidUrl(err.to_string())
        } else if err.is_decode() {
            Error::Serialization(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Socket(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
