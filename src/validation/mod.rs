//! Field checks shared by the profile and feed builders.
//!
//! Every failure names the offending field using a path such as
//! `contacts[2].value` so the user can find it in their input file.

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDate};
use regex::Regex;
use url::Url;

use crate::domain::{ChannelKind, FeedChannel, FeedEntry, IdentityProfile};
use crate::errors::{DsiError, DsiResult};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static TEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(tel:)?\+?[0-9 ()\-.]*[0-9][0-9 ()\-.]*$").expect("tel pattern")
});
static LANG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{2,8}(-[A-Za-z0-9]{1,8})*$").expect("language pattern")
});
static PLATFORM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9._-]*$").expect("platform pattern"));
static CUSTOM_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^X-[A-Z0-9][A-Z0-9-]*$").expect("custom name pattern"));

/// `X-` properties with a dedicated profile field.
pub const RESERVED_PROPERTIES: &[&str] = &["X-FEED", "X-SOCIAL", "X-ENDORSE"];

pub fn require_non_empty<'a>(field: &str, value: &'a str) -> DsiResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DsiError::validation(field, "must not be empty"));
    }
    Ok(trimmed)
}

pub fn validate_single_line(field: &str, value: &str) -> DsiResult<()> {
    if value.contains('\n') || value.contains('\r') {
        return Err(DsiError::validation(field, "must be a single line"));
    }
    Ok(())
}

pub fn validate_email(field: &str, value: &str) -> DsiResult<()> {
    let value = require_non_empty(field, value)?;
    if !EMAIL_RE.is_match(value) {
        return Err(DsiError::validation(
            field,
            format!("'{}' is not a valid email address", value),
        ));
    }
    Ok(())
}

pub fn validate_tel(field: &str, value: &str) -> DsiResult<()> {
    let value = require_non_empty(field, value)?;
    if !TEL_RE.is_match(value) {
        return Err(DsiError::validation(
            field,
            format!("'{}' is not a valid telephone number", value),
        ));
    }
    Ok(())
}

/// Absolute `http`/`https` URL.
pub fn validate_web_url(field: &str, value: &str) -> DsiResult<()> {
    let value = require_non_empty(field, value)?;
    let parsed = Url::parse(value)
        .map_err(|e| DsiError::validation(field, format!("'{}' is not a valid URL: {}", value, e)))?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(()),
        _ => Err(DsiError::validation(
            field,
            format!("'{}' must be an http(s) URL", value),
        )),
    }
}

/// Any absolute URI, e.g. `xmpp:alice@example.com`.
pub fn validate_uri(field: &str, value: &str) -> DsiResult<()> {
    let value = require_non_empty(field, value)?;
    if value.chars().any(char::is_whitespace) {
        return Err(DsiError::validation(field, "must not contain whitespace"));
    }
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| DsiError::validation(field, format!("'{}' is not a valid URI: {}", value, e)))
}

pub fn validate_date(field: &str, value: &str) -> DsiResult<()> {
    let value = require_non_empty(field, value)?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| DsiError::validation(field, format!("'{}' is not a YYYY-MM-DD date", value)))
}

pub fn validate_language(field: &str, value: &str) -> DsiResult<()> {
    if !LANG_RE.is_match(value) {
        return Err(DsiError::validation(
            field,
            format!("'{}' is not a language tag like 'en-US'", value),
        ));
    }
    Ok(())
}

pub fn validate_base64(field: &str, value: &str) -> DsiResult<()> {
    let value = require_non_empty(field, value)?;
    BASE64
        .decode(value)
        .map(|_| ())
        .map_err(|e| DsiError::validation(field, format!("invalid base64: {}", e)))
}

/// Parameter values may be quoted, so only quotes and line breaks are fatal.
pub fn validate_param_value(field: &str, value: &str) -> DsiResult<()> {
    validate_single_line(field, value)?;
    if value.contains('"') {
        return Err(DsiError::validation(field, "must not contain '\"'"));
    }
    Ok(())
}

pub fn validate_profile(profile: &IdentityProfile) -> DsiResult<()> {
    require_non_empty("name", &profile.name)?;

    for (i, contact) in profile.contacts.iter().enumerate() {
        let field = format!("contacts[{}].value", i);
        match contact.kind {
            ChannelKind::Email => validate_email(&field, &contact.value)?,
            ChannelKind::Tel => validate_tel(&field, &contact.value)?,
            ChannelKind::Impp => validate_uri(&field, &contact.value)?,
            ChannelKind::Url => validate_web_url(&field, &contact.value)?,
            ChannelKind::Social => {
                require_non_empty(&field, &contact.value)?;
                let platform_field = format!("contacts[{}].platform", i);
                let platform = contact
                    .platform
                    .as_deref()
                    .map(|p| p.trim().to_lowercase())
                    .unwrap_or_default();
                if platform.is_empty() {
                    return Err(DsiError::validation(
                        platform_field,
                        "social channels need a platform",
                    ));
                }
                if !PLATFORM_RE.is_match(&platform) {
                    return Err(DsiError::validation(
                        platform_field,
                        format!("'{}' is not a valid platform name", platform),
                    ));
                }
            }
        }
    }

    for (i, key) in profile.public_keys.iter().enumerate() {
        validate_base64(&format!("public_keys[{}].key", i), &key.key)?;
        let alg_field = format!("public_keys[{}].alg", i);
        require_non_empty(&alg_field, &key.alg)?;
        validate_param_value(&alg_field, &key.alg)?;
    }

    if let Some(lang) = &profile.lang {
        validate_language("lang", lang)?;
    }
    if let Some(bday) = &profile.bday {
        validate_date("bday", bday)?;
    }
    if let Some(anniversary) = &profile.anniversary {
        validate_date("anniversary", anniversary)?;
    }
    if let Some(photo) = &profile.photo {
        validate_web_url("photo", photo)?;
    }
    if let Some(source) = &profile.source {
        validate_web_url("source", source)?;
    }
    if let Some(n) = &profile.structured_name {
        validate_single_line("structured_name", n)?;
        if n.split(';').count() > 5 {
            return Err(DsiError::validation(
                "structured_name",
                "has more than 5 components",
            ));
        }
    }
    if let Some(adr) = &profile.adr {
        validate_single_line("adr", adr)?;
        if adr.split(';').count() > 7 {
            return Err(DsiError::validation("adr", "has more than 7 components"));
        }
    }
    for (field, value) in [
        ("nickname", &profile.nickname),
        ("gender", &profile.gender),
    ] {
        if let Some(value) = value {
            require_non_empty(field, value)?;
            validate_single_line(field, value)?;
        }
    }
    for (i, category) in profile.categories.iter().enumerate() {
        let field = format!("categories[{}]", i);
        require_non_empty(&field, category)?;
        validate_single_line(&field, category)?;
    }

    for (i, feed) in profile.feeds.iter().enumerate() {
        validate_web_url(&format!("feeds[{}].url", i), &feed.url)?;
        if let Some(lang) = &feed.language {
            validate_language(&format!("feeds[{}].language", i), lang)?;
        }
    }

    for (i, endorsement) in profile.endorsements.iter().enumerate() {
        validate_base64(
            &format!("endorsements[{}].endorsee_key", i),
            &endorsement.endorsee_key,
        )?;
        let sig_field = format!("endorsements[{}].signature", i);
        let sig = require_non_empty(&sig_field, &endorsement.signature)?;
        hex::decode(sig).map_err(|e| DsiError::validation(&sig_field, e.to_string()))?;
        if let Some(date) = &endorsement.date {
            validate_date(&format!("endorsements[{}].date", i), date)?;
        }
        if let Some(confidence) = &endorsement.confidence {
            validate_param_value(&format!("endorsements[{}].confidence", i), confidence)?;
        }
    }

    for (i, revoked) in profile.revocations.iter().enumerate() {
        validate_base64(&format!("revocations[{}].key", i), &revoked.key)?;
        if let Some(reason) = &revoked.reason {
            validate_param_value(&format!("revocations[{}].reason", i), reason)?;
        }
        if let Some(date) = &revoked.date {
            validate_date(&format!("revocations[{}].date", i), date)?;
        }
    }

    for (i, prop) in profile.extra.iter().enumerate() {
        let field = format!("extra[{}].name", i);
        let name = prop.name.trim().to_uppercase();
        if !CUSTOM_NAME_RE.is_match(&name) {
            return Err(DsiError::validation(
                field,
                format!("'{}' must look like X-SOMETHING", prop.name),
            ));
        }
        if RESERVED_PROPERTIES.contains(&name.as_str()) {
            return Err(DsiError::validation(
                field,
                format!("'{}' has a dedicated field", name),
            ));
        }
        require_non_empty(&format!("extra[{}].value", i), &prop.value)?;
    }

    Ok(())
}

pub fn validate_channel(channel: &FeedChannel) -> DsiResult<()> {
    require_non_empty("channel.title", &channel.title)?;
    validate_single_line("channel.title", &channel.title)?;
    validate_web_url("channel.link", &channel.link)?;
    validate_language("channel.language", &channel.language)?;

    if let Some(author) = &channel.author {
        require_non_empty("channel.author.name", &author.name)?;
        if let Some(email) = &author.email {
            validate_email("channel.author.email", email)?;
        }
    }
    Ok(())
}

/// Checks the entry sequence and returns the parsed timestamps in order.
pub fn validate_entries(entries: &[FeedEntry]) -> DsiResult<Vec<DateTime<FixedOffset>>> {
    if entries.is_empty() {
        return Err(DsiError::validation("entries", "a feed needs at least one entry"));
    }

    let mut stamps: Vec<DateTime<FixedOffset>> = Vec::with_capacity(entries.len());

    for (i, entry) in entries.iter().enumerate() {
        let ts_field = format!("entries[{}].timestamp", i);
        let ts = entry.parsed_timestamp().ok_or_else(|| {
            DsiError::validation(
                &ts_field,
                format!("'{}' is not a valid date-time", entry.timestamp),
            )
        })?;

        if let Some(prev) = stamps.last() {
            if ts < *prev {
                return Err(DsiError::validation(
                    &ts_field,
                    format!(
                        "'{}' is earlier than the previous entry; entries must be in chronological order",
                        entry.timestamp
                    ),
                ));
            }
        }

        let title_field = format!("entries[{}].title", i);
        require_non_empty(&title_field, &entry.title)?;
        validate_single_line(&title_field, &entry.title)?;

        if let Some(link) = &entry.link {
            validate_web_url(&format!("entries[{}].link", i), link)?;
        }

        stamps.push(ts);
    }

    Ok(stamps)
}
