use super::{ImportError, ImportedTrack};

/// Separator between artist and title on each line.
const SEPARATOR: &str = " - ";

/// Parse a plain "Artist - Title" list. Blank lines are skipped; the first
/// " - " splits the line, so titles may contain further dashes.
pub fn parse_track_list(contents: &str) -> Result<Vec<ImportedTrack>, ImportError> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let mut tracks = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let Some((artist, title)) = line.split_once(SEPARATOR) else {
            return Err(ImportError::MalformedLine {
                line: idx + 1,
                content: line.to_string(),
            });
        };

        tracks.push(ImportedTrack {
            artists: artist.trim().to_string(),
            title: title.trim_end().to_string(),
            genre: None,
        });
    }

    Ok(tracks)
}
