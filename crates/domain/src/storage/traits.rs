use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Common result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("encoding error: {0}")]
    Encode(String),
}

impl StorageError {
    pub fn io(err: impl std::fmt::Display) -> Self {
        Self::Io(err.to_string())
    }

    pub fn encode(err: impl std::fmt::Display) -> Self {
        Self::Encode(err.to_string())
    }
}

/// A raw transaction update captured for offline inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSnapshot {
    /// Timestamp label identifying when the update was received.
    pub label: String,
    pub body: Value,
}

/// Best-effort destination for raw updates. Callers never wait on it and
/// only log its failures.
#[async_trait]
pub trait RawEventSink: Send + Sync {
    async fn persist(&self, snapshot: RawSnapshot) -> StorageResult<()>;
}
