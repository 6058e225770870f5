pub mod profile_builder;
pub mod feed_builder;
pub mod post_service;
pub mod key_service;
pub mod inspect_service;
pub mod connections_service;
pub mod qr_service;

pub use profile_builder::ProfileBuilder;
pub use feed_builder::{FeedBuilder, RenderOptions};
pub use post_service::{NewPost, PostService};
pub use key_service::KeyService;
pub use inspect_service::{inspect, EndorsementStatus, InspectReport};
pub use connections_service::{collect_connections, export_opml, Connection, ConnectionsResult};
pub use qr_service::QrService;
