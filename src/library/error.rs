use std::fmt::Display;

use serde::Serialize;
use thiserror::Error;

use crate::{domain::track::TrackId, storage::error::StorageError};

/// Rejected input, detected before any store is contacted
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("a title is required")]
    MissingTitle,

    #[error("an audio file is required")]
    MissingBlob,

    #[error("the audio file is empty")]
    EmptyBlob,

    #[error("file is too large ({size_mb:.1}MB), the limit is {limit_mb}MB")]
    TooLarge { size_mb: f64, limit_mb: f64 },
}

/// The local list or a stored key did not match what the stores reported
#[derive(Debug, Error, PartialEq)]
pub enum ConsistencyError {
    #[error("track {0} is not in the current list")]
    NotInList(TrackId),

    #[error("track {track} has no valid storage key (stored reference: {reference:?})")]
    UnresolvableKey {
        track: TrackId,
        reference: Option<String>,
    },

    #[error("removing object {key} of track {track} removed nothing")]
    NothingRemoved { track: TrackId, key: String },

    #[error("no record was updated for track {0}")]
    NoRecordUpdated(TrackId),

    #[error("no record was deleted for track {0}")]
    NoRecordDeleted(TrackId),
}

/// Store call a failure originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Insert,
    Update,
    Delete,
    RemoveBlob,
    Select,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Upload => "upload",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::RemoveBlob => "remove-blob",
            Operation::Select => "select",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{operation} failed: {source}")]
    Store {
        operation: Operation,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error("another change is still in progress")]
    Busy,
}

impl LibraryError {
    /// Wraps a store error with the operation it came from, for use in `map_err`
    pub fn store(operation: Operation) -> impl FnOnce(StorageError) -> Self {
        move |source| LibraryError::Store { operation, source }
    }
}

/// Non-fatal: a blob may have been left behind without a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanWarning {
    pub key: String,
    pub reason: String,
}

impl Display for OrphanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "object {} may be orphaned: {}", self.key, self.reason)
    }
}
