use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{ChannelDraft, FeedEntry, IdentityProfile};
use crate::errors::{DsiError, DsiResult};
use crate::sources::markdown::markdown_to_html;
use crate::sources::traits::{EntrySource, FeedMaterial};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Toml,
}

impl InputFormat {
    /// TOML for `.toml` files, JSON for everything else.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => InputFormat::Toml,
            _ => InputFormat::Json,
        }
    }
}

pub fn parse_str<T: DeserializeOwned>(content: &str, format: InputFormat, origin: &str) -> DsiResult<T> {
    match format {
        InputFormat::Json => serde_json::from_str(content).map_err(|e| DsiError::parse(origin, e)),
        InputFormat::Toml => toml::from_str(content).map_err(|e| DsiError::parse(origin, e)),
    }
}

pub fn read_file<T: DeserializeOwned>(path: &Path) -> DsiResult<T> {
    let content = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = content.len(), "input file read");
    parse_str(&content, InputFormat::for_path(path), &path.display().to_string())
}

pub fn load_profile(path: &Path) -> DsiResult<IdentityProfile> {
    read_file(path)
}

#[derive(Debug, Deserialize)]
struct FeedDocument {
    #[serde(default)]
    channel: ChannelDraft,
    entries: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedFile {
    Document(FeedDocument),
    Entries(Vec<FeedEntry>),
}

impl From<FeedFile> for FeedMaterial {
    fn from(file: FeedFile) -> Self {
        let (channel, entries) = match file {
            FeedFile::Document(doc) => (doc.channel, doc.entries),
            FeedFile::Entries(entries) => (ChannelDraft::default(), entries),
        };

        // Bodies are written in Markdown, like posts.
        let entries = entries
            .into_iter()
            .map(|entry| {
                let body = entry.body.as_deref().map(markdown_to_html);
                entry.with_body(body)
            })
            .collect();

        FeedMaterial { channel, entries }
    }
}

/// Entries listed in a JSON or TOML file, kept in file order.
pub struct InputFileSource {
    path: PathBuf,
}

impl InputFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn parse(content: &str, format: InputFormat, origin: &str) -> DsiResult<FeedMaterial> {
        let file: FeedFile = parse_str(content, format, origin)?;
        Ok(file.into())
    }
}

impl EntrySource for InputFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> DsiResult<FeedMaterial> {
        let file: FeedFile = read_file(&self.path)?;
        Ok(file.into())
    }
}
