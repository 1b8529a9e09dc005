use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Separator between token and count in report lines.
const REPORT_SEPARATOR: &str = " - ";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("cannot access report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("report line {line}: expected \"<token> - <count>\", got {content:?}")]
    MalformedLine { line: usize, content: String },
}

/// A token and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCount {
    pub token: String,
    pub count: usize,
}

impl TokenCount {
    pub fn new(token: impl Into<String>, count: usize) -> Self {
        Self {
            token: token.into(),
            count,
        }
    }
}

/// Split every value on `delimiter`, trim, drop empty tokens, and count.
///
/// Sorted by descending count; tokens with equal counts keep the order in
/// which they were first seen.
pub fn count_tokens<S: AsRef<str>>(values: &[S], delimiter: &str) -> Vec<TokenCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<TokenCount> = Vec::new();

    for token in values
        .iter()
        .flat_map(|v| v.as_ref().split(delimiter))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        match index.get(token) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(token, counts.len());
                counts.push(TokenCount::new(token, 1));
            }
        }
    }

    // Stable sort keeps first-seen order among ties
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Render counts as report text, one `"<token> - <count>"` line each.
pub fn format_report(counts: &[TokenCount]) -> String {
    let mut out = String::new();
    for c in counts.iter().filter(|c| !c.token.is_empty()) {
        let _ = writeln!(out, "{}{REPORT_SEPARATOR}{}", c.token, c.count);
    }
    out
}

pub fn write_report(counts: &[TokenCount], path: &Path) -> Result<(), ReportError> {
    std::fs::write(path, format_report(counts)).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Wrote {} entries to {}", counts.len(), path.display());
    Ok(())
}

/// Parse report text back into counts, keeping line order.
///
/// Tokens may themselves contain " - ", so each line splits at the last one.
pub fn parse_report(text: &str) -> Result<Vec<TokenCount>, ReportError> {
    let mut counts = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let malformed = || ReportError::MalformedLine {
            line: idx + 1,
            content: line.to_string(),
        };
        let (token, count) = line.rsplit_once(REPORT_SEPARATOR).ok_or_else(malformed)?;
        let count = count.trim().parse().map_err(|_| malformed())?;
        counts.push(TokenCount::new(token, count));
    }
    Ok(counts)
}

pub fn read_report(path: &Path) -> Result<Vec<TokenCount>, ReportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_report(&text)
}
