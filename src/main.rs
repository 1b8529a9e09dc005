use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use genretally::db::Database;
use genretally::import::ImportFormat;
use genretally::lookup::EveryNoiseLookup;
use genretally::merge::MergeMode;
use genretally::pipeline::{self, RunOptions};
use genretally::resolver::{GenreResolver, SystemClock};
use genretally::stats::TokenCount;

#[derive(Parser)]
#[command(name = "genretally", version, about = "Music library genre statistics")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Config file (defaults to ~/.config/genretally/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a library export, look up artist genres, and write reports
    Run {
        /// Library export file (defaults to config import.path)
        path: Option<PathBuf>,

        /// Export format
        #[arg(long, value_enum)]
        format: Option<ImportFormat>,

        /// How looked-up genres combine with imported ones
        #[arg(long, value_enum)]
        merge_mode: Option<MergeMode>,

        /// Drop stored tracks before importing
        #[arg(long, conflicts_with = "keep")]
        clear: bool,

        /// Keep stored tracks and add to them
        #[arg(long)]
        keep: bool,

        /// Directory for report files
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Number of top entries to print per statistic
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Show artist and genre statistics for the stored library
    Stats {
        /// Format the stored tracks were imported with (picks the artist delimiter)
        #[arg(long, value_enum)]
        format: Option<ImportFormat>,

        /// Number of entries per statistic
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Inspect or invalidate the artist genre cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached artists and their genres
    List,
    /// Remove one artist so the next run looks it up again
    Forget { artist: String },
    /// Remove every cached artist
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let mut config = match &cli.config {
        Some(path) => genretally::config::AppConfig::load_from(path),
        None => genretally::config::AppConfig::load(),
    };

    // Resolve database path: CLI > config > XDG default
    let db_path = cli
        .db_path
        .or(config.db_path.clone())
        .unwrap_or_else(genretally::config::default_db_path);
    log::info!("Database: {}", db_path.display());

    let db = Database::open(&db_path).context("Failed to open database")?;

    match cli.command {
        Commands::Run {
            path,
            format,
            merge_mode,
            clear,
            keep,
            report_dir,
            limit,
        } => {
            let import_path = path.or(config.import.path.clone()).context(
                "No library export given. Pass a path or set import.path in config.",
            )?;
            if let Some(dir) = report_dir {
                config.reports.dir = dir;
            }
            let opts = RunOptions {
                import_path,
                format: format.unwrap_or(config.import.format),
                merge_mode: merge_mode.unwrap_or(config.merge.mode),
                clear_before_run: if clear || keep { clear } else { config.clear_before_run },
                reports: config.reports,
            };

            let lookup = EveryNoiseLookup::new(
                &config.lookup.base_url,
                Duration::from_secs(config.lookup.timeout_secs),
            );
            let mut resolver = GenreResolver::new(
                lookup,
                SystemClock,
                Duration::from_millis(config.lookup.rate_limit_ms),
            )
            .with_progress(true);

            let summary = pipeline::run(&db, &opts, &mut resolver)?;

            println!(
                "Import: {} read, {} new, {} already stored",
                summary.import.read, summary.import.inserted, summary.import.duplicates
            );
            println!(
                "Genres: {} artists, {} cached, {} looked up, {} lookups failed",
                summary.resolve.distinct,
                summary.resolve.cached,
                summary.resolve.looked_up,
                summary.resolve.failed
            );
            println!(
                "Merge ({:?}): {} updated, {} unmatched, {} skipped",
                summary.merge_mode,
                summary.merge.updated,
                summary.merge.unmatched,
                summary.merge.skipped
            );
            println!();

            print_counts("Top artists", &summary.artist_counts, limit);
            if let Some(source) = &summary.source_genre_counts {
                print_counts("Top source genres", source, limit);
            }
            print_counts("Top genres", &summary.genre_counts, limit);

            println!("Reports written to {}", opts.reports.dir.display());
        }

        Commands::Stats { format, limit } => {
            let format = format.unwrap_or(config.import.format);
            let stats = db.store_stats().context("Failed to get stats")?;
            let counts = pipeline::library_counts(&db, format.artist_delimiter())
                .context("Failed to count library")?;

            println!("Library Statistics");
            println!("==================");
            println!("Tracks:             {}", stats.total_tracks);
            println!("  without genres:   {}", stats.tracks_without_genres);
            println!("Cached artists:     {}", stats.cached_artists);
            println!("  without genres:   {}", stats.artists_without_genres);
            println!();

            print_counts("Artists", &counts.artists, limit);
            print_counts("Genres", &counts.genres, limit);
        }

        Commands::Cache { action } => match action {
            CacheAction::List => {
                let entries = db.cache_entries().context("Failed to read cache")?;
                if entries.is_empty() {
                    println!("Genre cache is empty.");
                    return Ok(());
                }
                for e in &entries {
                    let genres = if e.genres.is_empty() { "-" } else { e.genres.as_str() };
                    println!("{:<30} {}", e.artist, genres);
                }
            }
            CacheAction::Forget { artist } => {
                if db.forget_cached_artist(&artist).context("Failed to update cache")? {
                    println!("Forgot \"{artist}\"; it will be looked up on the next run.");
                } else {
                    println!("\"{artist}\" is not cached.");
                }
            }
            CacheAction::Clear => {
                let removed = db.clear_cache().context("Failed to clear cache")?;
                println!("Removed {removed} cached artists.");
            }
        },
    }

    Ok(())
}

/// Print the first `limit` entries of a statistic.
fn print_counts(title: &str, counts: &[TokenCount], limit: usize) {
    println!("{title} ({} distinct):", counts.len());
    if counts.is_empty() {
        println!("  (none)");
    }
    for c in counts.iter().take(limit) {
        println!("  {:<30} {}", c.token, c.count);
    }
    println!();
}
