use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("filesystem error: {0}")]
    Fs(#[from] std::io::Error),

    #[error("object {0} already exists")]
    ObjectExists(String),

    #[error("invalid object key {0:?}")]
    InvalidKey(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
