use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::{DsiError, DsiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    Rss,
    Atom,
}

impl FeedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedFormat::Rss => "rss",
            FeedFormat::Atom => "atom",
        }
    }

    /// Conventional file extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            FeedFormat::Rss => "rss",
            FeedFormat::Atom => "atom",
        }
    }
}

impl std::str::FromStr for FeedFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rss" | "rss2" => Ok(FeedFormat::Rss),
            "atom" => Ok(FeedFormat::Atom),
            _ => Err(format!("Unknown feed format: {}", s)),
        }
    }
}

impl std::fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Channel-level metadata shared by every entry in a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedChannel {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
}

pub fn default_language() -> String {
    "en-US".to_string()
}

impl FeedChannel {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            description: String::new(),
            language: default_language(),
            author: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: Option<Author>) -> Self {
        self.author = author;
        self
    }
}

/// Channel metadata gathered from several places before it is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelDraft {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub author: Option<String>,
    pub email: Option<String>,
}

impl ChannelDraft {
    /// Fills every gap in `self` from `fallback`.
    pub fn or(self, fallback: ChannelDraft) -> ChannelDraft {
        ChannelDraft {
            title: self.title.or(fallback.title),
            link: self.link.or(fallback.link),
            description: self.description.or(fallback.description),
            language: self.language.or(fallback.language),
            author: self.author.or(fallback.author),
            email: self.email.or(fallback.email),
        }
    }

    /// Names of required fields that are still missing.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            missing.push("title");
        }
        if self.link.as_deref().map_or(true, |l| l.trim().is_empty()) {
            missing.push("link");
        }
        missing
    }

    pub fn resolve(self) -> DsiResult<FeedChannel> {
        if let Some(field) = self.missing().first() {
            return Err(DsiError::validation(
                format!("channel.{}", field),
                "is required (pass a flag, set it in the input file or the environment)",
            ));
        }

        let author = match (self.author, self.email) {
            (Some(name), email) => Some(Author { name, email }),
            (None, Some(email)) => Some(Author {
                name: email.clone(),
                email: Some(email),
            }),
            (None, None) => None,
        };

        Ok(FeedChannel {
            title: self.title.unwrap_or_default(),
            link: self.link.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            language: self.language.unwrap_or_else(default_language),
            author,
        })
    }
}

impl From<&Config> for ChannelDraft {
    fn from(config: &Config) -> Self {
        ChannelDraft {
            title: config.feed_title.clone(),
            link: config.feed_link.clone(),
            description: config.feed_description.clone(),
            language: config.feed_language.clone(),
            author: config.author_name.clone(),
            email: config.author_email.clone(),
        }
    }
}

/// One status update in a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    #[serde(alias = "ts", alias = "date")]
    pub timestamp: String,
    pub title: String,
    #[serde(default, alias = "content", skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl FeedEntry {
    pub fn new(timestamp: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            title: title.into(),
            body: None,
            link: None,
            id: None,
        }
    }

    pub fn with_body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Accepts RFC 3339, RFC 2822 and bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt);
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Current time truncated to whole seconds, as used for generation stamps.
pub fn now_fixed() -> DateTime<FixedOffset> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0)
        .unwrap_or(now)
        .fixed_offset()
}
