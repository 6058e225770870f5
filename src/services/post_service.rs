use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::errors::{DsiError, DsiResult};
use crate::sources::markdown::{is_valid_post_date, render_post, slugify};
use crate::storage::traits::DocumentStore;
use crate::validation::{require_non_empty, validate_single_line};

pub const POST_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// What goes into a new post.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: Option<String>,
    pub message: String,
    /// Explicit date; defaults to the creation time.
    pub date: Option<String>,
    pub filename: Option<String>,
}

pub struct PostService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> PostService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Write the post into `dir` and return its path. Existing files are
    /// never replaced.
    pub fn create(&self, dir: &Path, post: &NewPost, now: DateTime<Utc>) -> DsiResult<PathBuf> {
        require_non_empty("message", &post.message)?;
        if let Some(title) = &post.title {
            validate_single_line("title", title)?;
        }

        let date = match &post.date {
            Some(date) if is_valid_post_date(date) => date.trim().to_string(),
            Some(date) => {
                return Err(DsiError::validation(
                    "date",
                    format!("'{}' is not a valid date-time", date),
                ))
            }
            None => now.format(POST_DATE_FORMAT).to_string(),
        };

        let path = dir.join(post_filename(post.filename.as_deref(), &date)?);
        if self.store.exists(&path) {
            return Err(DsiError::AlreadyExists(path.display().to_string()));
        }

        let content = render_post(post.title.as_deref(), &date, &post.message);
        self.store.write(&path, content.as_bytes())?;

        info!(path = %path.display(), date = %date, "post created");
        Ok(path)
    }
}

/// Given name with `.md` appended when it has no extension, or the slug of
/// the post date.
fn post_filename(requested: Option<&str>, date: &str) -> DsiResult<String> {
    match requested.map(str::trim) {
        Some("") => Err(DsiError::validation("filename", "must not be empty")),
        Some(name) if name.contains(|c: char| c == '/' || c == '\\') => Err(DsiError::validation(
            "filename",
            "must be a plain file name, use --dir for the location",
        )),
        Some(name) if Path::new(name).extension().is_some() => Ok(name.to_string()),
        Some(name) => Ok(format!("{}.md", name)),
        None => Ok(format!("{}.md", slugify(date))),
    }
}
