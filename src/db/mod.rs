pub mod models;
pub mod queries;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

pub struct Database {
    pub conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.ensure_schema()
    }

    /// Create the track and genre cache tables if they are missing.
    /// Safe to call any number of times.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tracks (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                -- One or more artist names joined by the import delimiter
                artists     TEXT NOT NULL,
                name        TEXT NOT NULL,
                -- Comma-joined genre labels, NULL until known
                genres      TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_tracks_key ON tracks(artists, name);

            CREATE TABLE IF NOT EXISTS artist_genres (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                artist      TEXT NOT NULL UNIQUE,
                -- Comma-joined, empty when the lookup found nothing
                genres      TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Drop every imported track and recreate an empty schema.
    /// The genre cache is left alone.
    pub fn reset_tracks(&self) -> Result<()> {
        self.conn.execute_batch("DROP TABLE IF EXISTS tracks;")?;
        self.ensure_schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(db: &Database, name: &str) -> bool {
        db.conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get::<_, i64>(0),
            )
            .unwrap()
            > 0
    }

    #[test]
    fn test_schema_created_on_open() {
        let db = Database::open_in_memory().unwrap();
        assert!(table_exists(&db, "tracks"));
        assert!(table_exists(&db, "artist_genres"));
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.ensure_schema().unwrap();
        db.ensure_schema().unwrap();
        assert!(table_exists(&db, "tracks"));
    }

    #[test]
    fn test_reset_tracks_keeps_cache() {
        let db = Database::open_in_memory().unwrap();
        db.insert_track_if_absent("Miles Davis", "So What", None).unwrap();
        db.put_cached_genres("Miles Davis", "cool jazz,jazz").unwrap();

        db.reset_tracks().unwrap();

        assert!(table_exists(&db, "tracks"));
        assert!(db.list_tracks().unwrap().is_empty());
        assert_eq!(
            db.get_cached_genres("Miles Davis").unwrap().as_deref(),
            Some("cool jazz,jazz")
        );
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert_track_if_absent("Nina Simone", "Sinnerman", None).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_tracks().unwrap().len(), 1);
    }
}
