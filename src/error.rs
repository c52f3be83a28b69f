//! Error types for the zkcopy tree replication engine.

use crate::writer::WriteSummary;
use thiserror::Error;

/// Errors surfaced by a coordination-service client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("Node does not exist: {0}")]
    NoNode(String),

    #[error("Node already exists: {0}")]
    NodeExists(String),

    #[error("Node has children: {0}")]
    NotEmpty(String),

    #[error("Version mismatch on node: {0}")]
    BadVersion(String),

    #[error("Connection lost")]
    ConnectionLoss,

    #[error("Session expired")]
    SessionExpired,

    #[error("Failed to connect to {connect}: {reason}")]
    Connect { connect: String, reason: String },

    #[error("Client error: {0}")]
    Other(String),
}

impl ClientError {
    /// Whether the error may succeed on retry after session recovery.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::ConnectionLoss | ClientError::SessionExpired)
    }
}

/// Configuration errors, rejected before any connection is attempted
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Source address is required")]
    MissingSource,

    #[error("Target address is required")]
    MissingTarget,

    #[error("Invalid cluster address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Worker count must be a positive integer, got {0}")]
    InvalidWorkers(usize),

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

/// Read-phase errors. Any of these aborts the whole snapshot.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Source root does not exist: {0}")]
    MissingRoot(String),

    #[error("Failed to read {path}: {source}")]
    Client {
        path: String,
        #[source]
        source: ClientError,
    },

    #[error("Read worker failed: {0}")]
    Worker(String),
}

/// Write-phase errors
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to prepare target {path}: {source}")]
    Client {
        path: String,
        #[source]
        source: ClientError,
    },

    #[error("{} node(s) failed to synchronize", .0.failed.len())]
    Incomplete(WriteSummary),
}

/// Top-level errors for a copy run
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection error: {0}")]
    Connect(ClientError),

    #[error("Read failed: {0}")]
    Read(#[from] ReadError),

    #[error("Write failed: {0}")]
    Write(#[from] WriteError),
}
