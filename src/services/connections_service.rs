use std::fs;
use std::path::{Path, PathBuf};

use opml::{Outline, OPML};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::FeedLink;
use crate::errors::{DsiError, DsiResult};
use crate::vcard::{parse_cards, profile_from_card};

const UNKNOWN_NAME: &str = "Unknown";

/// A contact whose card advertises at least one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub name: String,
    pub feeds: Vec<FeedLink>,
    pub source: PathBuf,
}

pub struct ConnectionsResult {
    pub connections: Vec<Connection>,
    pub skipped: Vec<(PathBuf, String)>, // (path, error_message)
}

fn is_card_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("vcf") || e.eq_ignore_ascii_case("vcard"))
}

/// Collect every card below `dir`. Unreadable cards are reported, not fatal.
pub fn collect_connections(dir: &Path) -> DsiResult<ConnectionsResult> {
    if !dir.is_dir() {
        return Err(DsiError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", dir.display()),
        )));
    }

    let mut result = ConnectionsResult {
        connections: Vec::new(),
        skipped: Vec::new(),
    };

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            DsiError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_card_file(path) {
            continue;
        }

        let cards = match fs::read_to_string(path)
            .map_err(DsiError::from)
            .and_then(|text| parse_cards(&text))
        {
            Ok(cards) => cards,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping card");
                result.skipped.push((path.to_path_buf(), e.to_string()));
                continue;
            }
        };

        for card in &cards {
            let profile = profile_from_card(card);
            let name = Some(profile.name.trim())
                .filter(|n| !n.is_empty())
                .unwrap_or(UNKNOWN_NAME)
                .to_string();

            if profile.feeds.is_empty() {
                debug!(path = %path.display(), name = %name, "card has no feeds");
                continue;
            }
            result.connections.push(Connection {
                name,
                feeds: profile.feeds,
                source: path.to_path_buf(),
            });
        }
    }

    Ok(result)
}

/// One outline per advertised feed, titled with the contact's name.
pub fn export_opml(connections: &[Connection]) -> DsiResult<String> {
    let mut opml = OPML::default();
    opml.head = Some(opml::Head {
        title: Some("dsi connections".to_string()),
        ..Default::default()
    });

    for connection in connections {
        for feed in &connection.feeds {
            let outline = Outline {
                text: connection.name.clone(),
                r#type: Some("rss".to_string()),
                xml_url: Some(feed.url.clone()),
                title: Some(connection.name.clone()),
                language: feed.language.clone(),
                ..Default::default()
            };
            opml.body.outlines.push(outline);
        }
    }

    opml.to_string().map_err(|e| DsiError::Opml(e.to_string()))
}
