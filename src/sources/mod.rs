pub mod traits;
pub mod input_file;
pub mod markdown;

pub use traits::{load_material, EntrySource, FeedMaterial};
pub use input_file::{load_profile, InputFileSource, InputFormat};
pub use markdown::MarkdownSource;
