use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    ChannelDraft, ChannelKind, ContactChannel, FeedFormat, FeedLink, IdentityProfile, ProfileKind,
    PublicKey,
};
use crate::errors::{DsiError, DsiResult};

#[derive(Parser)]
#[command(name = "dsi")]
#[command(about = "Publish a decentralized social identity: a vCard plus an RSS or Atom status feed")]
#[command(version)]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a vCard 4.0 contact card
    Profile(ProfileArgs),

    /// Build an RSS 2.0 or Atom 1.0 feed from status entries
    Feed(FeedArgs),

    /// Create a Markdown status post
    Post(PostArgs),

    /// Show the identity carried by a vCard and check its endorsements
    Inspect {
        /// vCard file to read
        path: PathBuf,

        /// Extra public key (PEM) trusted when checking endorsements
        #[arg(long = "trust", value_name = "PUB_PEM")]
        trust: Vec<PathBuf>,
    },

    /// Ed25519 key tooling
    #[command(subcommand)]
    Key(KeyCommands),

    /// Render a vCard (file or stdin) as a QR code PNG
    Qr {
        /// vCard file; read from stdin when omitted
        input: Option<PathBuf>,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Image placed in the middle of the code
        #[arg(long)]
        logo: Option<PathBuf>,
    },

    /// Build an OPML subscription list from a folder of vCards
    Connections {
        /// Folder with .vcf / .vcard files
        dir: PathBuf,

        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
pub struct ProfileArgs {
    /// JSON or TOML file with the profile fields
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output vCard path
    #[arg(short, long, default_value = "profile.vcf")]
    pub output: PathBuf,

    /// Full name (FN)
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub email: Vec<String>,

    #[arg(long)]
    pub tel: Vec<String>,

    /// Web page (URL)
    #[arg(long)]
    pub url: Vec<String>,

    /// Instant messaging URI, e.g. xmpp:alice@example.com
    #[arg(long)]
    pub impp: Vec<String>,

    /// Social handle as platform:handle, e.g. mastodon:@alice@example.social
    #[arg(long)]
    pub social: Vec<String>,

    #[arg(long)]
    pub note: Option<String>,

    /// Language tag for the card, e.g. en or es-MX
    #[arg(long)]
    pub lang: Option<String>,

    /// Structured name (N) as Family;Given
    #[arg(long, value_name = "FAMILY;GIVEN")]
    pub structured_name: Option<String>,

    #[arg(long)]
    pub nickname: Option<String>,

    /// Gender (GENDER), e.g. F, M, O or N
    #[arg(long)]
    pub gender: Option<String>,

    #[arg(long)]
    pub category: Vec<String>,

    /// Birthday (YYYY-MM-DD)
    #[arg(long)]
    pub bday: Option<String>,

    /// Anniversary (YYYY-MM-DD)
    #[arg(long)]
    pub anniversary: Option<String>,

    /// individual, group, org or location
    #[arg(long)]
    pub kind: Option<ProfileKind>,

    /// Postal address (ADR) as its seven ;-separated components
    #[arg(long)]
    pub adr: Option<String>,

    /// Photo URL
    #[arg(long)]
    pub photo: Option<String>,

    /// Canonical URL this card is published at (SOURCE)
    #[arg(long)]
    pub source: Option<String>,

    /// Feed URL to advertise (X-FEED)
    #[arg(long)]
    pub feed: Vec<String>,

    /// Base64 DER Ed25519 public key
    #[arg(long)]
    pub key: Vec<String>,

    /// Generate a keypair next to the output and publish it as preferred key
    #[arg(long)]
    pub generate_key: bool,

    /// Ask for anything required that is still missing
    #[arg(long)]
    pub interactive: bool,
}

impl ProfileArgs {
    /// Applies the flags on top of `base`. Scalar flags replace file values,
    /// list flags append to them.
    pub fn apply(&self, mut profile: IdentityProfile) -> DsiResult<IdentityProfile> {
        if let Some(name) = &self.name {
            profile.name = name.clone();
        }
        if let Some(note) = &self.note {
            profile.note = Some(note.clone());
        }
        if let Some(lang) = &self.lang {
            profile.lang = Some(lang.clone());
        }
        if let Some(kind) = self.kind {
            profile.kind = Some(kind);
        }

        let scalars = [
            (&mut profile.structured_name, &self.structured_name),
            (&mut profile.nickname, &self.nickname),
            (&mut profile.gender, &self.gender),
            (&mut profile.bday, &self.bday),
            (&mut profile.anniversary, &self.anniversary),
            (&mut profile.adr, &self.adr),
            (&mut profile.photo, &self.photo),
            (&mut profile.source, &self.source),
        ];
        for (field, flag) in scalars {
            if let Some(value) = flag {
                *field = Some(value.clone());
            }
        }
        profile.categories.extend(self.category.iter().cloned());

        let simple = [
            (ChannelKind::Email, &self.email),
            (ChannelKind::Tel, &self.tel),
            (ChannelKind::Url, &self.url),
            (ChannelKind::Impp, &self.impp),
        ];
        for (kind, values) in simple {
            for value in values {
                profile.contacts.push(ContactChannel::new(kind, value.clone()));
            }
        }

        for raw in &self.social {
            profile.contacts.push(parse_social(raw)?);
        }

        for url in &self.feed {
            profile.feeds.push(FeedLink {
                url: url.clone(),
                language: None,
            });
        }

        for key in &self.key {
            profile.public_keys.push(PublicKey {
                alg: "ed25519".to_string(),
                key: key.clone(),
                pref: None,
            });
        }

        Ok(profile)
    }
}

/// `platform:handle`
pub fn parse_social(raw: &str) -> DsiResult<ContactChannel> {
    match raw.split_once(':') {
        Some((platform, handle)) if !platform.trim().is_empty() && !handle.trim().is_empty() => {
            Ok(ContactChannel::social(platform.trim(), handle.trim()))
        }
        _ => Err(DsiError::InvalidInput(format!(
            "--social expects platform:handle, got '{}'",
            raw
        ))),
    }
}

#[derive(Args, Debug)]
pub struct FeedArgs {
    /// JSON or TOML file with channel settings and entries
    #[arg(short, long, conflicts_with = "dir")]
    pub input: Option<PathBuf>,

    /// Folder of Markdown posts
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Keep only the newest N posts
    #[arg(long, requires = "dir")]
    pub limit: Option<usize>,

    /// Output path (defaults to feed.rss or feed.atom)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(short, long, default_value = "rss")]
    pub format: FeedFormat,

    #[arg(long)]
    pub title: Option<String>,

    /// Site link; also the Atom feed id
    #[arg(long)]
    pub link: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub language: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    /// Generation time stamped into the feed (defaults to now)
    #[arg(long)]
    pub generated_at: Option<String>,

    /// Private key PEM used to sign RSS items
    #[arg(long)]
    pub sign_key: Option<PathBuf>,

    /// Ask for missing channel fields and, without --input or --dir, for entries
    #[arg(long)]
    pub interactive: bool,
}

impl FeedArgs {
    pub fn channel_draft(&self) -> ChannelDraft {
        ChannelDraft {
            title: self.title.clone(),
            link: self.link.clone(),
            description: self.description.clone(),
            language: self.language.clone(),
            author: self.author.clone(),
            email: self.email.clone(),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("feed.{}", self.format.extension())))
    }
}

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Post body (Markdown)
    #[arg(short, long)]
    pub message: String,

    #[arg(short, long)]
    pub title: Option<String>,

    /// Post date (defaults to now)
    #[arg(long)]
    pub date: Option<String>,

    /// File name (defaults to a slug of the date)
    #[arg(long)]
    pub filename: Option<String>,

    /// Folder the post is written to
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Generate an Ed25519 keypair
    Create {
        #[arg(long = "priv", value_name = "PATH")]
        private: PathBuf,

        #[arg(long = "pub", value_name = "PATH")]
        public: PathBuf,
    },

    /// Print a public key PEM as base64 DER for a vCard KEY
    Encode {
        /// Public key PEM file
        path: PathBuf,
    },

    /// Print a base64 DER public key as PEM
    Decode { key: String },

    /// Sign someone's preferred key and print the X-ENDORSE line
    Endorse {
        #[arg(long = "priv", value_name = "PATH")]
        private: PathBuf,

        /// Their vCard
        card: PathBuf,

        /// Endorsement date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        confidence: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_profile_flags_apply() {
        let cli = Cli::try_parse_from([
            "dsi", "profile", "--name", "Alice", "--email", "a@x.com", "--email", "b@x.com",
            "--social", "mastodon:@alice@example.social", "--feed", "https://alice.example/feed.rss",
        ])
        .unwrap();
        let Commands::Profile(args) = cli.command else {
            panic!("expected profile");
        };

        let profile = args.apply(IdentityProfile::default()).unwrap();
        assert_eq!(profile.name, "Alice");
        assert_eq!(profile.contacts.len(), 3);
        assert_eq!(profile.contacts[2].platform.as_deref(), Some("mastodon"));
        assert_eq!(profile.contacts[2].value, "@alice@example.social");
        assert_eq!(profile.feeds[0].url, "https://alice.example/feed.rss");
        assert_eq!(args.output, PathBuf::from("profile.vcf"));
    }

    #[test]
    fn test_flags_override_file_values() {
        let base = IdentityProfile::new("From file").with_note(Some("file note".into()));
        let args = ProfileArgs {
            name: Some("From flag".into()),
            ..Default::default()
        };
        let profile = args.apply(base).unwrap();
        assert_eq!(profile.name, "From flag");
        assert_eq!(profile.note.as_deref(), Some("file note"));
    }

    #[test]
    fn test_identity_detail_flags() {
        let cli = Cli::try_parse_from([
            "dsi", "profile", "--name", "Alice", "--structured-name", "Liddell;Alice",
            "--nickname", "Al", "--gender", "F", "--category", "writer", "--category", "cats",
            "--bday", "1990-05-04", "--kind", "individual", "--photo", "https://alice.example/me.png",
            "--source", "https://alice.example/alice.vcf",
        ])
        .unwrap();
        let Commands::Profile(args) = cli.command else {
            panic!("expected profile");
        };

        let mut base = IdentityProfile::new("Alice").with_note(Some("kept".into()));
        base.categories.push("reader".into());
        let profile = args.apply(base).unwrap();

        assert_eq!(profile.structured_name.as_deref(), Some("Liddell;Alice"));
        assert_eq!(profile.nickname.as_deref(), Some("Al"));
        assert_eq!(profile.gender.as_deref(), Some("F"));
        assert_eq!(profile.categories, vec!["reader", "writer", "cats"]);
        assert_eq!(profile.bday.as_deref(), Some("1990-05-04"));
        assert_eq!(profile.kind, Some(ProfileKind::Individual));
        assert_eq!(profile.photo.as_deref(), Some("https://alice.example/me.png"));
        assert_eq!(profile.source.as_deref(), Some("https://alice.example/alice.vcf"));
        assert_eq!(profile.note.as_deref(), Some("kept"));
        assert!(profile.anniversary.is_none());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(Cli::try_parse_from(["dsi", "profile", "--kind", "robot"]).is_err());
    }

    #[test]
    fn test_parse_social() {
        assert!(parse_social("github").is_err());
        assert!(parse_social(":alice").is_err());
        let contact = parse_social("GitHub: alice").unwrap();
        assert_eq!(contact.value, "alice");
    }

    #[test]
    fn test_feed_defaults() {
        let cli = Cli::try_parse_from(["dsi", "feed", "--format", "atom", "--title", "T"]).unwrap();
        let Commands::Feed(args) = cli.command else {
            panic!("expected feed");
        };
        assert_eq!(args.output_path(), PathBuf::from("feed.atom"));
        assert_eq!(args.channel_draft().title.as_deref(), Some("T"));
    }

    #[test]
    fn test_qr_requires_output() {
        assert!(Cli::try_parse_from(["dsi", "qr", "me.vcf"]).is_err());
        let cli = Cli::try_parse_from(["dsi", "qr", "-o", "me.png"]).unwrap();
        assert!(matches!(cli.command, Commands::Qr { input: None, .. }));
    }

    #[test]
    fn test_limit_requires_dir() {
        assert!(Cli::try_parse_from(["dsi", "feed", "--limit", "3"]).is_err());
        assert!(Cli::try_parse_from(["dsi", "feed", "-i", "a.json", "-d", "posts"]).is_err());
    }
}
