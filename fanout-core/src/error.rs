use thiserror::Error;

pub type Result<T> = std::result::Result<T, FanoutError>;

#[derive(Error, Debug)]
pub enum FanoutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Node unreachable: node={node_id} reason={reason}")]
    NodeUnreachable { node_id: String, reason: String },

    #[error("Quorum not met: need {required}, succeeded {succeeded}")]
    QuorumNotMet { required: usize, succeeded: usize },

    #[error("Blob unavailable: fingerprint={fingerprint} attempted={attempted}")]
    BlobUnavailable { fingerprint: String, attempted: usize },

    #[error("Content hash mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
