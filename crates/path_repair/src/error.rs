//! Error types for path repair

use crate::types::ServerId;
use std::io::Error as IoError;
use thiserror::Error;

/// Failures raised by a remote transport.
///
/// These never escape the validator; they only turn a candidate invalid.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection to {0} timed out")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Authentication failed for {0}")]
    Authentication(String),

    #[error("Remote path not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// Server repository failures
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Server {0} not found")]
    NotFound(ServerId),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to (de)serialize servers: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type RepairResult<T> = Result<T, RepairError>;
