pub mod profile;
pub mod feed;

pub use profile::{
    ChannelKind, ContactChannel, CustomProperty, Endorsement, FeedLink, IdentityProfile,
    ProfileKind, PublicKey, RevokedKey,
};
pub use feed::{parse_timestamp, Author, ChannelDraft, FeedChannel, FeedEntry, FeedFormat};
