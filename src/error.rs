use std::io;
use thiserror::Error;

/// Main error type for onedrive-adapter operations
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Remote API returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Upload aborted after {uploaded} of {total} bytes: {reason}")]
    PartialUpload {
        uploaded: u64,
        total: u64,
        reason: String,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AdapterError {
    /// Map an HTTP status and response body to an error
    pub fn from_status(status: u16, endpoint: &str, body: &str) -> Self {
        if status == 404 {
            AdapterError::NotFound(endpoint.to_string())
        } else {
            AdapterError::Remote {
                status,
                message: body.to_string(),
            }
        }
    }

    /// Whether the remote side reported the object as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, AdapterError::NotFound(_))
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AdapterError::MalformedResponse(e.to_string())
        } else {
            AdapterError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        AdapterError::MalformedResponse(e.to_string())
    }
}

/// Result type alias for onedrive-adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;
