/// A track row read from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    pub id: i64,
    pub artists: String,
    pub name: String,
    pub genres: Option<String>,
}

/// A resolved artist in the genre cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Insertion order; lower ids were resolved first.
    pub id: i64,
    pub artist: String,
    /// Comma-joined labels. Empty means "looked up, nothing found".
    pub genres: String,
}

/// Row counts for the `stats` command.
#[derive(Debug, Default)]
pub struct StoreStats {
    pub total_tracks: i64,
    pub tracks_without_genres: i64,
    pub cached_artists: i64,
    pub artists_without_genres: i64,
}
