use std::path::Path;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::{
    config::Database,
    storage::{error::StorageError, schema},
};

pub type MillisSinceUnix = i64;

fn open_in_memory() -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open_in_memory()
}

fn open_from_file(path: &Path) -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open(path)
}

pub fn open(config: &Database) -> Result<rusqlite::Connection, StorageError> {
    let db = match (config.in_memory, &config.path) {
        (true, _) => open_in_memory()?,
        (false, Some(path)) => open_from_file(path)?,
        (false, None) => {
            return Err(StorageError::Internal(anyhow!(
                "database is not in memory but no path is configured"
            )));
        }
    };
    schema::init(&db)?;
    Ok(db)
}

/// current time as milliseconds since unix epoch
pub fn now_millis() -> MillisSinceUnix {
    Utc::now().timestamp_millis()
}

/// converts milliseconds since unix epoch to a UTC date time
pub fn millis_to_utc(since_unix: MillisSinceUnix) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(since_unix)
        .ok_or(anyhow!("failed to convert {since_unix} ms timestamp to datetime"))
}
