//! Error types for poolctl.

use thiserror::Error;

/// Main error type for poolctl.
#[derive(Error, Debug)]
pub enum PoolctlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid RPC address '{0}'. Expected tcp://host:port or host:port")]
    InvalidAddress(String),

    #[error("{method}: {message}")]
    Remote { method: String, message: String },

    #[error("Failed to fetch workers of [{pool}]")]
    Snapshot {
        pool: String,
        #[source]
        source: Box<PoolctlError>,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl PoolctlError {
    /// Build a remote error for the given RPC method.
    pub fn remote(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            method: method.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for poolctl operations.
pub type Result<T> = std::result::Result<T, PoolctlError>;
