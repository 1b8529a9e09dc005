pub mod everynoise;

use std::collections::BTreeSet;

use thiserror::Error;

pub use everynoise::EveryNoiseLookup;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("request for {artist:?} failed: {source}")]
    Http {
        artist: String,
        #[source]
        source: ureq::Error,
    },
    #[error("unexpected response for {artist:?}: {reason}")]
    UnexpectedResponse { artist: String, reason: String },
}

/// Source of genre labels for a single artist name.
pub trait GenreLookup {
    /// Labels for `artist`, deduplicated. An empty set means the source
    /// knows nothing about the artist.
    fn lookup(&mut self, artist: &str) -> Result<BTreeSet<String>, LookupError>;
}
