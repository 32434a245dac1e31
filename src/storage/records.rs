use std::sync::Mutex;

use anyhow::anyhow;
use rusqlite::{Row, params};

use crate::{
    config,
    domain::track::{NewTrack, Track, TrackChanges, TrackId},
    storage::{
        db::{self, MillisSinceUnix, millis_to_utc},
        error::StorageError,
        schema::{columns, tables},
    },
};

use columns::*;
use tables::*;

/// Sort order of `select`, always by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Table of track records
pub trait MetadataStore {
    fn select(&self, order: Order) -> Result<Vec<Track>, StorageError>;

    /// Inserts a record, the store assigns `id` and `created_at`
    fn insert(&self, record: &NewTrack) -> Result<TrackId, StorageError>;

    /// Returns the number of affected rows
    fn update(&self, id: TrackId, changes: &TrackChanges) -> Result<usize, StorageError>;

    /// Returns the number of affected rows
    fn delete(&self, id: TrackId) -> Result<usize, StorageError>;
}

/// SQLite-backed metadata store
pub struct SqliteStore {
    pub(crate) db: Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    /// when called, opens a data base connection
    pub fn new(db_config: &config::Database) -> Result<Self, StorageError> {
        let db = db::open(db_config)?;
        Ok(Self::from_existing_conn(db))
    }

    pub fn from_existing_conn(db: rusqlite::Connection) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>, StorageError> {
        self.db.lock().map_err(|e| {
            StorageError::Internal(anyhow!("Could not access track database under lock: {e}"))
        })
    }

    /// Reads one record, `None` when absent
    #[cfg(test)]
    pub fn get(&self, id: TrackId) -> Result<Option<Track>, StorageError> {
        use rusqlite::OptionalExtension;

        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {ID}, {TITLE}, {DESCRIPTION}, {FILE_PATH}, {PUBLIC_URL}, {CREATED_AT}, {PUBLISHED}
                     FROM {TRACKS} WHERE {ID} = ?1"
                ),
                params![id.0],
                TrackRow::from_row,
            )
            .optional()?;
        row.map(TrackRow::into_track).transpose()
    }
}

/// Raw row, converted to a `Track` outside of rusqlite's row closure
struct TrackRow {
    id: i64,
    title: String,
    description: Option<String>,
    file_path: Option<String>,
    public_url: Option<String>,
    created_at: MillisSinceUnix,
    published: Option<bool>,
}

impl TrackRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            file_path: row.get(3)?,
            public_url: row.get(4)?,
            created_at: row.get(5)?,
            published: row.get(6)?,
        })
    }

    fn into_track(self) -> Result<Track, StorageError> {
        Ok(Track {
            id: TrackId(self.id),
            title: self.title,
            description: self.description.unwrap_or_default(),
            storage_key: self.file_path,
            public_url: self.public_url,
            created_at: millis_to_utc(self.created_at).map_err(StorageError::Internal)?,
            published: self.published,
        })
    }
}

impl MetadataStore for SqliteStore {
    fn select(&self, order: Order) -> Result<Vec<Track>, StorageError> {
        let direction = match order {
            Order::NewestFirst => "DESC",
            Order::OldestFirst => "ASC",
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ID}, {TITLE}, {DESCRIPTION}, {FILE_PATH}, {PUBLIC_URL}, {CREATED_AT}, {PUBLISHED}
             FROM {TRACKS} ORDER BY {CREATED_AT} {direction}, {ID} {direction}"
        ))?;

        let rows = stmt
            .query_map([], TrackRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        rows.into_iter().map(TrackRow::into_track).collect()
    }

    fn insert(&self, record: &NewTrack) -> Result<TrackId, StorageError> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {TRACKS} ({TITLE}, {DESCRIPTION}, {FILE_PATH}, {PUBLIC_URL}, {CREATED_AT}, {PUBLISHED})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ),
            params![
                record.title,
                record.description,
                record.storage_key,
                record.public_url,
                db::now_millis(),
                record.published,
            ],
        )?;
        let id = TrackId(conn.last_insert_rowid());
        log::debug!("inserted track {id} ({})", record.storage_key);
        Ok(id)
    }

    fn update(&self, id: TrackId, changes: &TrackChanges) -> Result<usize, StorageError> {
        let conn = self.conn()?;
        let affected = match &changes.object {
            Some(object) => conn.execute(
                &format!(
                    "UPDATE {TRACKS} SET {TITLE} = ?1, {DESCRIPTION} = ?2, {FILE_PATH} = ?3, {PUBLIC_URL} = ?4
                     WHERE {ID} = ?5"
                ),
                params![
                    changes.title,
                    changes.description,
                    object.key,
                    object.public_url,
                    id.0
                ],
            )?,
            None => conn.execute(
                &format!("UPDATE {TRACKS} SET {TITLE} = ?1, {DESCRIPTION} = ?2 WHERE {ID} = ?3"),
                params![changes.title, changes.description, id.0],
            )?,
        };
        log::debug!("updated track {id}, {affected} row(s)");
        Ok(affected)
    }

    fn delete(&self, id: TrackId) -> Result<usize, StorageError> {
        let conn = self.conn()?;
        let affected = conn.execute(
            &format!("DELETE FROM {TRACKS} WHERE {ID} = ?1"),
            params![id.0],
        )?;
        log::debug!("deleted track {id}, {affected} row(s)");
        Ok(affected)
    }
}
