pub mod config;
pub mod db;
pub mod import;
pub mod lookup;
pub mod merge;
pub mod pipeline;
pub mod resolver;
pub mod stats;

/// Application name for XDG paths
pub const APP_NAME: &str = "genretally";
