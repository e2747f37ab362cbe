use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    /// File open/seek/read/write failure. Always fatal to the running operation.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The indexing run was cancelled before it finished.
    #[error("indexing cancelled")]
    Cancelled,

    /// Malformed metadata, skip-list header or posting bytes.
    #[error("corrupt index data: {0}")]
    Corrupt(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl IndexError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        IndexError::Corrupt(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, IndexError::Cancelled)
    }
}

impl From<bincode::Error> for IndexError {
    fn from(e: bincode::Error) -> Self {
        IndexError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        IndexError::Serialization(e.to_string())
    }
}
