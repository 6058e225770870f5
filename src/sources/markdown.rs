use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use pulldown_cmark::{html, Parser};
use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::{parse_timestamp, ChannelDraft, FeedEntry};
use crate::errors::{DsiError, DsiResult};
use crate::sources::traits::{EntrySource, FeedMaterial};

const FRONT_MATTER_DELIMITER: &str = "---";
const FRONT_MATTER_FIELDS: &[&str] = &["title", "date", "link", "id"];

static NON_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern"));

/// Lowercase ASCII slug, runs of anything else collapse to one hyphen.
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    NON_SLUG_RE
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<String>,
    pub link: Option<String>,
    pub id: Option<String>,
}

impl FrontMatter {
    fn set(&mut self, field: &str, value: String) {
        let value = Some(value).filter(|v| !v.is_empty());
        match field {
            "title" => self.title = value,
            "date" => self.date = value,
            "link" => self.link = value,
            "id" => self.id = value,
            _ => {}
        }
    }
}

/// Splits an optional `---` delimited header from the Markdown body.
pub fn split_front_matter(text: &str) -> (FrontMatter, &str) {
    let mut front = FrontMatter::default();

    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (front, text);
    };
    if first.trim() != FRONT_MATTER_DELIMITER {
        return (front, text);
    }

    let mut consumed = first.len();
    for line in lines {
        consumed += line.len();
        let line = line.trim();
        if line == FRONT_MATTER_DELIMITER {
            return (front, &text[consumed..]);
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_lowercase();
            if FRONT_MATTER_FIELDS.contains(&key.as_str()) {
                front.set(&key, value.trim().to_string());
            }
        }
    }

    // Unterminated header: treat the whole file as body.
    (FrontMatter::default(), text)
}

/// Renders the file content for a new post.
pub fn render_post(title: Option<&str>, date: &str, message: &str) -> String {
    let mut out = String::new();
    out.push_str(FRONT_MATTER_DELIMITER);
    out.push('\n');
    if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
        out.push_str(&format!("title: {}\n", title.trim()));
    }
    out.push_str(&format!("date: {}\n", date));
    out.push_str(FRONT_MATTER_DELIMITER);
    out.push('\n');
    out.push_str(message);
    if !message.ends_with('\n') {
        out.push('\n');
    }
    out
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut out = String::new();
    html::push_html(&mut out, Parser::new(markdown));
    out
}

/// Every `*.md` file below a directory, one entry per file.
pub struct MarkdownSource {
    dir: PathBuf,
    limit: Option<usize>,
}

impl MarkdownSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            limit: None,
        }
    }

    /// Keep only the newest `limit` posts.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    fn collect_paths(&self) -> DsiResult<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(DsiError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", self.dir.display()),
            )));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                DsiError::Io(
                    e.into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
                )
            })?;
            let is_markdown = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("md"));
            if entry.file_type().is_file() && is_markdown {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }

    fn read_post(&self, path: &Path) -> DsiResult<FeedEntry> {
        let text = fs::read_to_string(path)?;
        let (front, body) = split_front_matter(&text);

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let timestamp = match front.date {
            Some(date) => date,
            None => {
                let modified: DateTime<Utc> = fs::metadata(path)?.modified()?.into();
                debug!(path = %path.display(), "no date in front matter, using mtime");
                modified.format("%Y-%m-%dT%H:%M:%SZ").to_string()
            }
        };

        let body = body.trim();
        let body = if body.is_empty() {
            None
        } else {
            Some(markdown_to_html(body))
        };

        Ok(FeedEntry::new(timestamp, front.title.unwrap_or_else(|| stem.clone()))
            .with_body(body)
            .with_link(front.link)
            .with_id(Some(front.id.unwrap_or_else(|| self.default_id(path)))))
    }

    /// Slug of the path below the posts directory, so posts with the same
    /// file name in different folders keep distinct ids.
    fn default_id(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.dir).unwrap_or(path);
        slugify(&relative.with_extension("").to_string_lossy())
    }
}

impl EntrySource for MarkdownSource {
    fn describe(&self) -> String {
        format!("markdown posts in {}", self.dir.display())
    }

    fn load(&self) -> DsiResult<FeedMaterial> {
        let mut dated = Vec::new();

        for path in self.collect_paths()? {
            let entry = self.read_post(&path)?;
            let ts = entry.parsed_timestamp().ok_or_else(|| {
                DsiError::validation(
                    format!("{}: date", path.display()),
                    format!("'{}' is not a valid date-time", entry.timestamp),
                )
            })?;
            dated.push((ts, entry));
        }

        if dated.is_empty() {
            warn!(dir = %self.dir.display(), "no markdown posts found");
        }

        // Stable sort keeps file-name order for equal dates.
        dated.sort_by_key(|(ts, _)| *ts);

        if let Some(limit) = self.limit {
            let skip = dated.len().saturating_sub(limit);
            dated.drain(..skip);
        }

        Ok(FeedMaterial {
            channel: ChannelDraft::default(),
            entries: dated.into_iter().map(|(_, e)| e).collect(),
        })
    }
}

/// Checks a post date the same way feed entries are checked.
pub fn is_valid_post_date(date: &str) -> bool {
    parse_timestamp(date).is_some()
}
