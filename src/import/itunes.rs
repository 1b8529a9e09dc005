//! iTunes / Music "Library.xml" reader.
//!
//! The export is an Apple property list: a top-level `<dict>` whose `Tracks`
//! key maps track ids to per-track dicts of alternating `<key>`/value nodes.

use roxmltree::{Document, Node, ParsingOptions};

use super::{ImportError, ImportedTrack};

pub fn parse_library_xml(xml: &str) -> Result<Vec<ImportedTrack>, ImportError> {
    // Real exports always carry a plist DOCTYPE
    let opts = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(xml, opts)?;

    let root_dict = doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name("dict"))
        .ok_or(ImportError::MissingTracks)?;
    let tracks_dict = dict_value(root_dict, "Tracks")
        .filter(|n| n.has_tag_name("dict"))
        .ok_or(ImportError::MissingTracks)?;

    let mut tracks = Vec::new();
    for track in tracks_dict.children().filter(|n| n.has_tag_name("dict")) {
        let artist = dict_string(track, "Artist");
        let name = dict_string(track, "Name");

        match (artist, name) {
            (Some(artists), Some(title)) => tracks.push(ImportedTrack {
                artists,
                title,
                genre: dict_string(track, "Genre"),
            }),
            (artist, name) => {
                log::debug!(
                    "Skipping library entry without artist or name (artist={artist:?}, name={name:?})"
                );
            }
        }
    }

    Ok(tracks)
}

/// Value node following `<key>{key}</key>` in a plist dict.
fn dict_value<'a, 'input>(dict: Node<'a, 'input>, key: &str) -> Option<Node<'a, 'input>> {
    let mut children = dict.children().filter(|n| n.is_element());
    while let Some(k) = children.next() {
        let value = children.next()?;
        if k.has_tag_name("key") && k.text() == Some(key) {
            return Some(value);
        }
    }
    None
}

fn dict_string(dict: Node, key: &str) -> Option<String> {
    dict_value(dict, key)
        .filter(|n| n.has_tag_name("string"))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple Computer//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>Major Version</key><integer>1</integer>
	<key>Application Version</key><string>12.9.5.5</string>
	<key>Tracks</key>
	<dict>
		<key>1001</key>
		<dict>
			<key>Track ID</key><integer>1001</integer>
			<key>Name</key><string>Get Lucky</string>
			<key>Artist</key><string>Daft Punk &amp; Pharrell Williams</string>
			<key>Genre</key><string>Electronic</string>
			<key>Total Time</key><integer>369000</integer>
		</dict>
		<key>1002</key>
		<dict>
			<key>Track ID</key><integer>1002</integer>
			<key>Name</key><string>So What</string>
			<key>Artist</key><string>Miles Davis</string>
		</dict>
		<key>1003</key>
		<dict>
			<key>Track ID</key><integer>1003</integer>
			<key>Name</key><string>Voice Memo</string>
		</dict>
	</dict>
	<key>Playlists</key>
	<array></array>
</dict>
</plist>
"#;

    #[test]
    fn test_parse_tracks_in_document_order() {
        let tracks = parse_library_xml(LIBRARY).unwrap();
        assert_eq!(tracks.len(), 2);

        assert_eq!(tracks[0].artists, "Daft Punk & Pharrell Williams");
        assert_eq!(tracks[0].title, "Get Lucky");
        assert_eq!(tracks[0].genre.as_deref(), Some("Electronic"));

        assert_eq!(tracks[1].artists, "Miles Davis");
        assert_eq!(tracks[1].genre, None);
    }

    #[test]
    fn test_missing_tracks_dict() {
        let xml = r#"<plist version="1.0"><dict><key>Playlists</key><array/></dict></plist>"#;
        assert!(matches!(
            parse_library_xml(xml),
            Err(ImportError::MissingTracks)
        ));
    }

    #[test]
    fn test_invalid_xml() {
        assert!(matches!(
            parse_library_xml("<plist><dict>"),
            Err(ImportError::Xml(_))
        ));
    }

    #[test]
    fn test_dict_value_ignores_value_nodes_named_like_keys() {
        let xml = r#"<dict><key>A</key><string>Tracks</string><key>Tracks</key><dict/></dict>"#;
        let doc = Document::parse(xml).unwrap();
        let value = dict_value(doc.root_element(), "Tracks").unwrap();
        assert!(value.has_tag_name("dict"));
        assert!(dict_value(doc.root_element(), "Missing").is_none());
    }
}
