//! Assign cached artist genres to track rows.
//!
//! A cache entry matches a track when the entry's artist name is a substring
//! of the track's artists field. This is deliberately approximate: "Daft Punk"
//! also matches "The Daft Punk Tribute Band", and "Queen & David Bowie" is
//! matched by both of its artists. Exactly one entry is applied per row,
//! chosen by [`find_match`].

use serde::Deserialize;

use crate::db::models::{CacheEntry, TrackRow};
use crate::db::{self, Database};

/// How matched genres are written into a track's genres field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Replace the field with the matched genres (NULL when nothing matches)
    #[default]
    Overwrite,
    /// Append matched genres to a single-valued source genre
    Append,
}

/// Result of a merge pass.
#[derive(Debug, Default)]
pub struct MergeSummary {
    pub updated: usize,
    pub unmatched: usize,
    /// Append mode only: rows left alone because they hold no source genre
    /// or already hold a list.
    pub skipped: usize,
}

/// The cache entry to apply to `artists`, if any.
///
/// Among entries whose artist is a substring of `artists`, the longest name
/// wins; equal lengths go to the entry cached first (lowest id). Entries
/// with a blank artist never match.
pub fn find_match<'a>(artists: &str, entries: &'a [CacheEntry]) -> Option<&'a CacheEntry> {
    entries
        .iter()
        .filter(|e| !e.artist.is_empty() && artists.contains(e.artist.as_str()))
        .min_by(|a, b| {
            b.artist
                .len()
                .cmp(&a.artist.len())
                .then(a.id.cmp(&b.id))
        })
}

/// New genres value for a row, or None to leave the row untouched.
fn merged_genres(
    row: &TrackRow,
    matched: Option<&CacheEntry>,
    mode: MergeMode,
) -> Option<Option<String>> {
    match mode {
        MergeMode::Overwrite => {
            let genres = matched.map(|e| e.genres.clone());
            (genres != row.genres).then_some(genres)
        }
        MergeMode::Append => {
            let entry = matched.filter(|e| !e.genres.is_empty())?;
            let existing = row.genres.as_deref().map(str::trim).filter(|g| !g.is_empty())?;
            Some(Some(format!("{existing}, {}", entry.genres)))
        }
    }
}

/// Append mode only enriches rows holding exactly one source genre: a
/// non-blank value without a comma. Enriched rows always gain a comma, so a
/// second pass leaves them alone.
fn is_single_source_genre(genres: Option<&str>) -> bool {
    genres.is_some_and(|g| !g.trim().is_empty() && !g.contains(','))
}

/// Rewrite the genres field of every track from the genre cache.
///
/// Overwrite mode sets each row to its match's genres, or NULL without one.
/// Append mode only touches rows with a single source genre (see
/// [`is_single_source_genre`]): the match is appended after ", ". Rows
/// without a source genre or without a usable match keep their value.
pub fn merge_genres(db: &Database, mode: MergeMode) -> db::Result<MergeSummary> {
    let entries = db.cache_entries()?;
    let tracks = db.list_tracks()?;
    let mut summary = MergeSummary::default();

    for row in &tracks {
        if mode == MergeMode::Append && !is_single_source_genre(row.genres.as_deref()) {
            summary.skipped += 1;
            continue;
        }

        let matched = find_match(&row.artists, &entries);
        if matched.is_none() {
            summary.unmatched += 1;
        }

        if let Some(genres) = merged_genres(row, matched, mode) {
            db.set_track_genres(row.id, genres.as_deref())?;
            summary.updated += 1;
        }
    }

    log::info!(
        "Merged genres ({mode:?}): {} updated, {} unmatched, {} skipped",
        summary.updated,
        summary.unmatched,
        summary.skipped
    );
    Ok(summary)
}
