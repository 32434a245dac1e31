use std::{fmt::Display, num::ParseIntError, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents the track ID.
///
/// Assigned once by the metadata store on insert and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub i64);

impl Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TrackId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A track record as stored in the metadata store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub description: String,
    /// Reference to the blob. New rows hold a canonical key, historical rows
    /// may hold `bucket/key` or a full public URL.
    pub storage_key: Option<String>,
    pub public_url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// `None` means visible
    pub published: Option<bool>,
}

impl Track {
    /// Visitor-facing listings hide only tracks explicitly unpublished.
    pub fn is_visible(&self) -> bool {
        self.published != Some(false)
    }
}

/// Binary audio content together with the name it was uploaded under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Blob {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Operator input for create and update
#[derive(Debug, Clone, Default)]
pub struct TrackForm {
    pub title: String,
    pub description: String,
    pub blob: Option<Blob>,
}

/// Where an uploaded blob ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub public_url: String,
}

/// Insert payload for a new record
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrack {
    pub title: String,
    pub description: String,
    pub storage_key: String,
    pub public_url: String,
    pub published: bool,
}

/// Update payload. `object` is `None` when the blob is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackChanges {
    pub title: String,
    pub description: String,
    pub object: Option<StoredObject>,
}
