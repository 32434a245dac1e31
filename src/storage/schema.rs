use rusqlite::Connection;

pub mod tables {
    pub const TRACKS: &str = "tracks";

    pub const ALL_TABLES: &[&str] = &[TRACKS];
}

pub mod columns {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const FILE_PATH: &str = "file_path";
    pub const PUBLIC_URL: &str = "public_url";
    pub const CREATED_AT: &str = "created_at";
    pub const PUBLISHED: &str = "published";
}

pub use columns::*;
pub use tables::*;

// AUTOINCREMENT keeps ids of deleted rows from being handed out again.
// `created_at` is milliseconds since the unix epoch.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tracks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    file_path TEXT,
    public_url TEXT,
    created_at INTEGER NOT NULL,
    published INTEGER
);

CREATE INDEX IF NOT EXISTS tracks_created_at ON tracks (created_at);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
