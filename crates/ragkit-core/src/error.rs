use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before any network call (e.g. an empty query).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A remote embedding, generation, or index call failed after any
    /// retries it was entitled to.
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Index error: {0}")]
    Index(String),

    /// A data operation was attempted before `initialize`. Contract
    /// violation: fatal to the caller, never retried.
    #[error("Vector index not initialized")]
    NotInitialized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
