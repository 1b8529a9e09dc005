use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use ureq::Agent;

use super::{GenreLookup, LookupError};

pub const DEFAULT_BASE_URL: &str = "https://everynoise.com/lookup.cgi";

/// The lookup page ends with two navigation links that are not genres.
const TRAILING_NAV_LINKS: usize = 2;

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>(.*?)</a\s*>").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").unwrap());

/// Genre lookup against the everynoise.com artist lookup page.
pub struct EveryNoiseLookup {
    agent: Agent,
    base_url: String,
}

impl EveryNoiseLookup {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.to_string(),
        }
    }

    fn url_for(&self, artist: &str) -> String {
        format!("{}?who={}", self.base_url, urlencoding::encode(artist))
    }
}

impl GenreLookup for EveryNoiseLookup {
    fn lookup(&mut self, artist: &str) -> Result<BTreeSet<String>, LookupError> {
        let url = self.url_for(artist);
        log::debug!("Fetching {url}");

        let http_err = |source: ureq::Error| LookupError::Http {
            artist: artist.to_string(),
            source,
        };
        let body = self
            .agent
            .get(&url)
            .call()
            .map_err(http_err)?
            .body_mut()
            .read_to_string()
            .map_err(http_err)?;

        parse_genre_links(&body).ok_or_else(|| LookupError::UnexpectedResponse {
            artist: artist.to_string(),
            reason: "page contains no links".to_string(),
        })
    }
}

/// Genre labels from a lookup page: the text of every link except the
/// trailing navigation. Returns None for a page without any links.
pub fn parse_genre_links(html: &str) -> Option<BTreeSet<String>> {
    let links: Vec<String> = ANCHOR_RE
        .captures_iter(html)
        .map(|c| link_text(&c[1]))
        .collect();

    if links.is_empty() {
        return None;
    }

    let keep = links.len().saturating_sub(TRAILING_NAV_LINKS);
    Some(
        links
            .into_iter()
            .take(keep)
            .filter(|l| !l.is_empty())
            .collect(),
    )
}

fn link_text(inner: &str) -> String {
    let text = TAG_RE.replace_all(inner, "");
    decode_entities(text.trim())
}

/// Decode numeric character references and the common named entities.
/// References to invalid code points are left as written.
fn decode_entities(s: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(s, |c: &regex::Captures| {
        let code = match (c.get(1), c.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse().ok(),
            (None, None) => None,
        };
        match code.and_then(char::from_u32) {
            Some(ch) => ch.to_string(),
            None => c[0].to_string(),
        }
    });

    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
