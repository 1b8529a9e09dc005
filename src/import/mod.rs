pub mod itunes;
pub mod text;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::db::Database;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid library XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("library XML has no Tracks dictionary")]
    MissingTracks,
    #[error("line {line}: expected \"Artist - Title\", got {content:?}")]
    MalformedLine { line: usize, content: String },
}

/// Shape of the library export being imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ImportFormat {
    /// iTunes / Music "Library.xml" export
    #[default]
    Structured,
    /// One "Artist - Title" per line
    PlainText,
}

impl ImportFormat {
    /// Delimiter between artist names within one track's artists field.
    pub fn artist_delimiter(self) -> &'static str {
        match self {
            Self::Structured => "&",
            Self::PlainText => ",",
        }
    }

    /// Whether the source carries its own genre tags.
    pub fn has_source_genres(self) -> bool {
        matches!(self, Self::Structured)
    }
}

/// One track as read from an export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedTrack {
    /// May hold several artists joined by the format's delimiter.
    pub artists: String,
    pub title: String,
    pub genre: Option<String>,
}

/// Counts from storing an import.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub read: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

/// Read and parse a library export file.
pub fn read_library(path: &Path, format: ImportFormat) -> Result<Vec<ImportedTrack>, ImportError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let tracks = match format {
        ImportFormat::Structured => itunes::parse_library_xml(&contents)?,
        ImportFormat::PlainText => text::parse_track_list(&contents)?,
    };
    log::info!("Read {} tracks from {}", tracks.len(), path.display());
    Ok(tracks)
}

/// Insert imported tracks, skipping ones already in the store.
pub fn store_tracks(db: &Database, tracks: &[ImportedTrack]) -> crate::db::Result<ImportSummary> {
    let mut summary = ImportSummary {
        read: tracks.len(),
        ..Default::default()
    };

    for t in tracks {
        if db.insert_track_if_absent(&t.artists, &t.title, t.genre.as_deref())? {
            summary.inserted += 1;
        } else {
            log::debug!("Already stored: {} - {}", t.artists, t.title);
            summary.duplicates += 1;
        }
    }

    Ok(summary)
}
