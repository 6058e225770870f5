use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::DsiResult;
use crate::storage::traits::DocumentStore;

/// Writes documents to the local filesystem.
///
/// Content goes to a temporary file in the destination directory first and
/// is renamed over the target once fully flushed, so a failed write never
/// leaves a truncated document behind.
#[derive(Debug, Clone, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore for FileStore {
    fn write(&self, path: &Path, content: &[u8]) -> DsiResult<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(content)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        debug!(path = %path.display(), bytes = content.len(), "document written");
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> DsiResult<()> {
        std::fs::remove_file(path)?;
        debug!(path = %path.display(), "document removed");
        Ok(())
    }
}
