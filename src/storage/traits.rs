use std::path::Path;

use tracing::warn;

use crate::errors::DsiResult;

/// Destination for generated documents.
#[cfg_attr(test, mockall::automock)]
pub trait DocumentStore: Send + Sync {
    /// Write the whole document or nothing at all.
    fn write(&self, path: &Path, content: &[u8]) -> DsiResult<()>;
    fn exists(&self, path: &Path) -> bool;
    fn remove(&self, path: &Path) -> DsiResult<()>;
}

/// Write several documents that only make sense together. When one write
/// fails, the documents already written by this call are removed again.
pub fn write_all<S: DocumentStore + ?Sized>(
    store: &S,
    documents: &[(&Path, &[u8])],
) -> DsiResult<()> {
    for (done, (path, content)) in documents.iter().enumerate() {
        if let Err(e) = store.write(path, content) {
            for (written, _) in &documents[..done] {
                if let Err(cleanup) = store.remove(written) {
                    warn!(
                        path = %written.display(),
                        error = %cleanup,
                        "could not remove partial output"
                    );
                }
            }
            return Err(e);
        }
    }
    Ok(())
}
