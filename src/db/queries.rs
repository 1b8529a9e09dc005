use super::models::{CacheEntry, StoreStats, TrackRow};
use super::{Database, Result};
use rusqlite::params;

impl Database {
    /// Insert a track unless one with the same (artists, name) already exists.
    /// Returns true when a row was written.
    pub fn insert_track_if_absent(
        &self,
        artists: &str,
        name: &str,
        genres: Option<&str>,
    ) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO tracks (artists, name, genres)
             SELECT ?1, ?2, ?3
             WHERE NOT EXISTS (
                 SELECT 1 FROM tracks WHERE artists = ?1 AND name = ?2
             )",
            params![artists, name, genres],
        )?;
        Ok(inserted > 0)
    }

    /// Every stored artists value split on `delimiter`, trimmed and flattened.
    /// Duplicates are kept so the result can be counted.
    pub fn list_artist_fields(&self, delimiter: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT artists FROM tracks ORDER BY id")?;
        let fields = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(fields
            .iter()
            .flat_map(|f| f.split(delimiter))
            .map(|a| a.trim().to_string())
            .collect())
    }

    /// Every stored genres value, NULLs included.
    pub fn list_genre_fields(&self) -> Result<Vec<Option<String>>> {
        let mut stmt = self.conn.prepare("SELECT genres FROM tracks ORDER BY id")?;
        let genres = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(genres)
    }

    pub fn list_tracks(&self) -> Result<Vec<TrackRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, artists, name, genres FROM tracks ORDER BY id")?;

        let tracks = stmt
            .query_map([], |row| {
                Ok(TrackRow {
                    id: row.get(0)?,
                    artists: row.get(1)?,
                    name: row.get(2)?,
                    genres: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tracks)
    }

    pub fn set_track_genres(&self, track_id: i64, genres: Option<&str>) -> Result<()> {
        self.conn.execute(
            "UPDATE tracks SET genres = ?1 WHERE id = ?2",
            params![genres, track_id],
        )?;
        Ok(())
    }

    /// Cached genres for an exact artist name, if it was ever resolved.
    pub fn get_cached_genres(&self, artist: &str) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT genres FROM artist_genres WHERE artist = ?1",
            params![artist],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(genres) => Ok(Some(genres)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Cache genres for an artist. Fails if the artist is already cached.
    pub fn put_cached_genres(&self, artist: &str, genres: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO artist_genres (artist, genres) VALUES (?1, ?2)",
            params![artist, genres],
        )?;
        Ok(())
    }

    /// All cache entries in insertion order.
    pub fn cache_entries(&self) -> Result<Vec<CacheEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, artist, genres FROM artist_genres ORDER BY id")?;

        let entries = stmt
            .query_map([], |row| {
                Ok(CacheEntry {
                    id: row.get(0)?,
                    artist: row.get(1)?,
                    genres: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Remove one artist from the cache so the next run looks it up again.
    /// Returns true if an entry was removed.
    pub fn forget_cached_artist(&self, artist: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM artist_genres WHERE artist = ?1",
            params![artist],
        )?;
        Ok(removed > 0)
    }

    /// Empty the genre cache. Returns the number of entries removed.
    pub fn clear_cache(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM artist_genres", [])?)
    }

    pub fn store_stats(&self) -> Result<StoreStats> {
        let (total_tracks, tracks_without_genres): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN genres IS NULL OR TRIM(genres) = '' THEN 1 ELSE 0 END), 0)
             FROM tracks",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let (cached_artists, artists_without_genres): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN genres = '' THEN 1 ELSE 0 END), 0)
             FROM artist_genres",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(StoreStats {
            total_tracks,
            tracks_without_genres,
            cached_artists,
            artists_without_genres,
        })
    }
}
