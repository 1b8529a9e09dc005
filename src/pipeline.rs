use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::ReportConfig;
use crate::db::{self, Database};
use crate::import::{self, ImportFormat, ImportSummary};
use crate::lookup::GenreLookup;
use crate::merge::{self, MergeMode, MergeSummary};
use crate::resolver::{Clock, GenreResolver, ResolveSummary};
use crate::stats::{self, TokenCount};

/// Everything one run needs, already resolved from config and CLI.
#[derive(Debug)]
pub struct RunOptions {
    pub import_path: PathBuf,
    pub format: ImportFormat,
    pub merge_mode: MergeMode,
    pub clear_before_run: bool,
    pub reports: ReportConfig,
}

/// Outcome of a full run.
#[derive(Debug)]
pub struct RunSummary {
    pub import: ImportSummary,
    pub resolve: ResolveSummary,
    pub merge: MergeSummary,
    pub merge_mode: MergeMode,
    pub artist_counts: Vec<TokenCount>,
    pub genre_counts: Vec<TokenCount>,
    /// Genres as imported, before enrichment. Structured imports only.
    pub source_genre_counts: Option<Vec<TokenCount>>,
}

/// Artist and genre counts over the current store.
#[derive(Debug)]
pub struct LibraryCounts {
    pub artists: Vec<TokenCount>,
    pub genres: Vec<TokenCount>,
}

/// Count artists (split with `delimiter`) and comma-separated genres.
pub fn library_counts(db: &Database, delimiter: &str) -> db::Result<LibraryCounts> {
    let artists = db.list_artist_fields(delimiter)?;
    Ok(LibraryCounts {
        artists: stats::count_tokens(&artists, delimiter),
        genres: genre_counts(db)?,
    })
}

fn genre_counts(db: &Database) -> db::Result<Vec<TokenCount>> {
    let genres: Vec<String> = db.list_genre_fields()?.into_iter().flatten().collect();
    Ok(stats::count_tokens(&genres, ","))
}

/// Import, resolve, merge, and export, in that order.
///
/// Every store write commits on its own, so an interrupted run can be
/// resumed: with `clear_before_run` off, stored tracks and cached artists
/// are skipped.
pub fn run<L: GenreLookup, C: Clock>(
    db: &Database,
    opts: &RunOptions,
    resolver: &mut GenreResolver<L, C>,
) -> Result<RunSummary> {
    if opts.clear_before_run {
        log::info!("Clearing stored tracks");
        db.reset_tracks().context("Failed to clear stored tracks")?;
    }
    db.ensure_schema().context("Failed to prepare database schema")?;

    // Import
    let tracks = import::read_library(&opts.import_path, opts.format)
        .with_context(|| format!("Import failed for {}", opts.import_path.display()))?;
    let imported =
        import::store_tracks(db, &tracks).context("Import failed while storing tracks")?;
    log::info!(
        "Imported {} tracks ({} new, {} already stored)",
        imported.read,
        imported.inserted,
        imported.duplicates
    );

    // Resolution
    let delimiter = opts.format.artist_delimiter();
    let artists = db
        .list_artist_fields(delimiter)
        .context("Genre resolution failed while listing artists")?;
    let artist_counts = stats::count_tokens(&artists, delimiter);
    let resolve = resolver
        .resolve_all(db, &artists)
        .context("Genre resolution failed")?;

    let source_genre_counts = if opts.format.has_source_genres() {
        let source: Vec<&str> = tracks.iter().filter_map(|t| t.genre.as_deref()).collect();
        let counts = stats::count_tokens(&source, ",");
        stats::write_report(&counts, &opts.reports.source_genres_path())
            .context("Export failed")?;
        Some(counts)
    } else {
        None
    };

    // Merge
    let merge_mode = if opts.merge_mode == MergeMode::Append && !opts.format.has_source_genres() {
        log::warn!("Append merge needs source genres; {:?} import has none, overwriting", opts.format);
        MergeMode::Overwrite
    } else {
        opts.merge_mode
    };
    let merge = merge::merge_genres(db, merge_mode).context("Merge failed")?;

    // Export
    let genre_counts = genre_counts(db).context("Export failed while counting genres")?;
    stats::write_report(&genre_counts, &opts.reports.genres_path()).context("Export failed")?;
    stats::write_report(&artist_counts, &opts.reports.artists_path()).context("Export failed")?;

    Ok(RunSummary {
        import: imported,
        resolve,
        merge,
        merge_mode,
        artist_counts,
        genre_counts,
        source_genre_counts,
    })
}
