use tracing::{debug, warn};

use crate::domain::{ChannelDraft, FeedEntry};
use crate::errors::DsiResult;

/// Everything a source knows about the feed it describes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedMaterial {
    pub channel: ChannelDraft,
    /// Entries in chronological order.
    pub entries: Vec<FeedEntry>,
}

#[cfg_attr(test, mockall::automock)]
pub trait EntrySource: Send + Sync {
    /// Human readable origin, used in logs and messages
    fn describe(&self) -> String;

    /// Load channel hints and the ordered entries
    fn load(&self) -> DsiResult<FeedMaterial>;
}

/// Load from any source, logging where the entries came from.
pub fn load_material(source: &dyn EntrySource) -> DsiResult<FeedMaterial> {
    let origin = source.describe();
    let material = source.load()?;

    if material.entries.is_empty() {
        warn!(source = %origin, "source has no entries");
    } else {
        debug!(source = %origin, entries = material.entries.len(), "entries loaded");
    }
    Ok(material)
}
