use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::import::ImportFormat;
use crate::lookup::everynoise::DEFAULT_BASE_URL;
use crate::merge::MergeMode;

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults; the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Custom database path (overrides XDG default).
    pub db_path: Option<PathBuf>,
    /// Drop imported tracks before each run. The genre cache is kept.
    pub clear_before_run: bool,
    pub import: ImportConfig,
    pub merge: MergeConfig,
    pub lookup: LookupConfig,
    pub reports: ReportConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            clear_before_run: true,
            import: ImportConfig::default(),
            merge: MergeConfig::default(),
            lookup: LookupConfig::default(),
            reports: ReportConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ImportConfig {
    /// Library export to import (used when `run` has no path argument).
    pub path: Option<PathBuf>,
    pub format: ImportFormat,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct MergeConfig {
    pub mode: MergeMode,
}

/// Genre lookup settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub base_url: String,
    /// Minimum gap between lookup requests in milliseconds.
    pub rate_limit_ms: u64,
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limit_ms: 1000,
            timeout_secs: 30,
        }
    }
}

/// Report output locations. File names are joined onto `dir`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub dir: PathBuf,
    pub genres: String,
    pub artists: String,
    /// Genres as found in the import, before enrichment (structured imports only).
    pub source_genres: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            genres: "genres_stat.txt".to_string(),
            artists: "artists_stat.txt".to_string(),
            source_genres: "genres_stat_source.txt".to_string(),
        }
    }
}

impl ReportConfig {
    pub fn genres_path(&self) -> PathBuf {
        self.dir.join(&self.genres)
    }

    pub fn artists_path(&self) -> PathBuf {
        self.dir.join(&self.artists)
    }

    pub fn source_genres_path(&self) -> PathBuf {
        self.dir.join(&self.source_genres)
    }
}

impl AppConfig {
    /// Load config from `~/.config/genretally/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load config from an explicit path, falling back to defaults on error.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default database path using XDG data directory.
pub fn default_db_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).ok();
        data_dir.join("genretally.db")
    } else {
        // Fallback: current directory
        PathBuf::from("genretally.db")
    }
}
