use std::collections::BTreeMap;
use std::path::Path;

use atom_syndication as atom;
use chrono::{DateTime, FixedOffset, Timelike};
use rss::extension::atom::AtomExtension;
use rss::extension::{Extension, ExtensionMap};
use scraper::Html;
use tracing::{debug, info};

use crate::domain::{FeedChannel, FeedEntry, FeedFormat};
use crate::errors::{DsiError, DsiResult};
use crate::security::FeedSigner;
use crate::sources::markdown::slugify;
use crate::storage::traits::DocumentStore;
use crate::validation::{validate_channel, validate_entries};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
const GENERATOR: &str = "dsi";
const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How a feed is rendered. The generation time is always supplied by the
/// caller so that identical input produces identical output.
pub struct RenderOptions<'a> {
    pub format: FeedFormat,
    pub generated_at: DateTime<FixedOffset>,
    pub signer: Option<&'a FeedSigner>,
}

impl<'a> RenderOptions<'a> {
    pub fn new(format: FeedFormat, generated_at: DateTime<FixedOffset>) -> Self {
        Self {
            format,
            generated_at,
            signer: None,
        }
    }

    pub fn with_signer(mut self, signer: Option<&'a FeedSigner>) -> Self {
        self.signer = signer;
        self
    }
}

pub struct FeedBuilder<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> FeedBuilder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validate, render and write the feed. Nothing is written when
    /// validation or rendering fails.
    pub fn build(
        &self,
        channel: &FeedChannel,
        entries: &[FeedEntry],
        options: &RenderOptions<'_>,
        output: &Path,
    ) -> DsiResult<String> {
        let document = render(channel, entries, options)?;
        self.store.write(output, document.as_bytes())?;

        info!(
            output = %output.display(),
            format = %options.format,
            entries = entries.len(),
            signed = options.signer.is_some(),
            "feed written"
        );
        Ok(document)
    }
}

pub fn render(
    channel: &FeedChannel,
    entries: &[FeedEntry],
    options: &RenderOptions<'_>,
) -> DsiResult<String> {
    validate_channel(channel)?;
    let stamps = validate_entries(entries)?;

    if options.format == FeedFormat::Rss {
        reject_subsecond_stamps(entries, &stamps)?;
    }

    debug!(format = %options.format, entries = entries.len(), "rendering feed");

    match options.format {
        FeedFormat::Rss => render_rss(channel, entries, &stamps, options),
        FeedFormat::Atom => render_atom(channel, entries, &stamps, options),
    }
}

/// Stable identifier for an entry: explicit id, then link, then a slug of
/// timestamp and title. Bare ids are qualified with the channel link.
pub fn entry_id(channel: &FeedChannel, entry: &FeedEntry) -> String {
    let raw = entry
        .id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .or_else(|| entry.link.clone())
        .unwrap_or_else(|| slugify(&format!("{}-{}", entry.timestamp, entry.title)));

    if raw.contains(':') {
        raw
    } else {
        format!("{}#{}", channel.link.trim_end_matches('/'), raw)
    }
}

/// Extract plain text from HTML content, preserving word boundaries
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_fragment(html);
    let mut text = String::new();

    for node in document.root_element().descendants() {
        if let Some(text_node) = node.value().as_text() {
            text.push_str(text_node);
        }
        if let Some(element) = node.value().as_element() {
            match element.name() {
                "p" | "br" | "div" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    text.push(' ')
                }
                _ => {}
            }
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// RFC 822 dates stop at whole seconds, so RSS cannot carry these stamps.
fn reject_subsecond_stamps(
    entries: &[FeedEntry],
    stamps: &[DateTime<FixedOffset>],
) -> DsiResult<()> {
    match stamps.iter().position(|ts| ts.nanosecond() != 0) {
        Some(i) => Err(DsiError::validation(
            format!("entries[{}].timestamp", i),
            format!(
                "'{}' has sub-second precision, which RSS dates cannot represent; use --format atom",
                entries[i].timestamp
            ),
        )),
        None => Ok(()),
    }
}

fn rss_author(channel: &FeedChannel) -> Option<String> {
    let author = channel.author.as_ref()?;
    let email = author.email.as_ref()?;
    Some(format!("{} ({})", email, author.name))
}

fn signature_extension(signature: String, key_id: &str) -> ExtensionMap {
    let mut attrs = BTreeMap::new();
    attrs.insert("keyId".to_string(), key_id.to_string());

    let extension = Extension {
        name: "signature".to_string(),
        value: Some(signature),
        attrs,
        ..Default::default()
    };

    let mut by_name = BTreeMap::new();
    by_name.insert("signature".to_string(), vec![extension]);
    let mut map = ExtensionMap::new();
    map.insert("dsi".to_string(), by_name);
    map
}

fn render_rss(
    channel: &FeedChannel,
    entries: &[FeedEntry],
    stamps: &[DateTime<FixedOffset>],
    options: &RenderOptions<'_>,
) -> DsiResult<String> {
    let author = rss_author(channel);

    let items = entries
        .iter()
        .zip(stamps)
        .map(|(entry, ts)| {
            let pub_date = ts.to_rfc2822();
            let mut item = rss::Item {
                title: Some(entry.title.clone()),
                link: entry.link.clone(),
                description: entry.body.clone(),
                author: author.clone(),
                guid: Some(rss::Guid {
                    value: entry_id(channel, entry),
                    permalink: false,
                }),
                pub_date: Some(pub_date.clone()),
                ..Default::default()
            };

            if let Some(signer) = options.signer {
                let signature = signer.sign_item(
                    &pub_date,
                    &entry.title,
                    entry.body.as_deref().unwrap_or_default(),
                );
                item.extensions = signature_extension(signature, signer.key_id());
            }
            item
        })
        .collect();

    let mut namespaces = BTreeMap::new();
    namespaces.insert("atom".to_string(), ATOM_NAMESPACE.to_string());

    let rss_channel = rss::Channel {
        title: channel.title.clone(),
        link: channel.link.clone(),
        description: channel.description.clone(),
        language: Some(channel.language.clone()),
        managing_editor: author,
        last_build_date: Some(options.generated_at.to_rfc2822()),
        generator: Some(format!("{} {}", GENERATOR, GENERATOR_VERSION)),
        items,
        namespaces,
        atom_ext: Some(AtomExtension {
            links: vec![atom::Link {
                href: channel.link.clone(),
                rel: "self".to_string(),
                mime_type: Some("application/rss+xml".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    };

    let bytes = rss_channel.pretty_write_to(Vec::new(), b' ', 2)?;
    String::from_utf8(bytes).map_err(|e| DsiError::Render(e.to_string()))
}

fn render_atom(
    channel: &FeedChannel,
    entries: &[FeedEntry],
    stamps: &[DateTime<FixedOffset>],
    options: &RenderOptions<'_>,
) -> DsiResult<String> {
    let authors: Vec<atom::Person> = channel
        .author
        .iter()
        .map(|a| atom::Person {
            name: a.name.clone(),
            email: a.email.clone(),
            uri: None,
            ..Default::default()
        })
        .collect();

    let atom_entries = entries
        .iter()
        .zip(stamps)
        .map(|(entry, ts)| atom::Entry {
            title: atom::Text::plain(entry.title.clone()),
            id: entry_id(channel, entry),
            updated: *ts,
            published: Some(*ts),
            links: entry
                .link
                .iter()
                .map(|href| atom::Link {
                    href: href.clone(),
                    rel: "alternate".to_string(),
                    ..Default::default()
                })
                .collect(),
            summary: entry
                .body
                .as_deref()
                .map(|body| atom::Text::plain(html_to_text(body))),
            content: entry.body.as_ref().map(|body| atom::Content {
                value: Some(body.clone()),
                content_type: Some("html".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
        .collect();

    let feed = atom::Feed {
        title: atom::Text::plain(channel.title.clone()),
        id: channel.link.clone(),
        updated: options.generated_at,
        authors,
        links: vec![atom::Link {
            href: channel.link.clone(),
            rel: "alternate".to_string(),
            ..Default::default()
        }],
        subtitle: Some(channel.description.clone())
            .filter(|d| !d.trim().is_empty())
            .map(atom::Text::plain),
        generator: Some(atom::Generator {
            value: GENERATOR.to_string(),
            uri: None,
            version: Some(GENERATOR_VERSION.to_string()),
        }),
        lang: Some(channel.language.clone()),
        entries: atom_entries,
        ..Default::default()
    };

    let bytes = feed.write_to(Vec::new())?;
    String::from_utf8(bytes).map_err(|e| DsiError::Render(e.to_string()))
}
