pub mod traits;
pub mod file;

pub use traits::{write_all, DocumentStore};
pub use file::FileStore;
