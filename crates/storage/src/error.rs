use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid stored row: {0}")]
    InvalidRow(String),

    #[error("commit cancelled")]
    Cancelled,

    #[error("commit task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;
