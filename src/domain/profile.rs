use serde::{Deserialize, Serialize};

/// Kind of a contact channel in a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Tel,
    Impp,
    Url,
    Social,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::Tel => "tel",
            ChannelKind::Impp => "impp",
            ChannelKind::Url => "url",
            ChannelKind::Social => "social",
        }
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "email" | "mail" => Ok(ChannelKind::Email),
            "tel" | "phone" => Ok(ChannelKind::Tel),
            "impp" | "im" => Ok(ChannelKind::Impp),
            "url" | "web" => Ok(ChannelKind::Url),
            "social" => Ok(ChannelKind::Social),
            _ => Err(format!("Unknown contact channel type: {}", s)),
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactChannel {
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    pub value: String,
    /// Platform name, only meaningful for social channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl ContactChannel {
    pub fn new(kind: ChannelKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            platform: None,
        }
    }

    pub fn social(platform: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: ChannelKind::Social,
            value: value.into(),
            platform: Some(platform.into()),
        }
    }
}

/// Public key published in the card, base64 encoded DER.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(default = "default_alg")]
    pub alg: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pref: Option<u8>,
}

fn default_alg() -> String {
    "ed25519".to_string()
}

/// Signature over someone else's key, published as `X-ENDORSE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    pub endorsee_key: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokedKey {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedLink {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Free-form `X-` property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomProperty {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Individual,
    Group,
    Org,
    Location,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Individual => "individual",
            ProfileKind::Group => "group",
            ProfileKind::Org => "org",
            ProfileKind::Location => "location",
        }
    }
}

impl std::str::FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "individual" => Ok(ProfileKind::Individual),
            "group" => Ok(ProfileKind::Group),
            "org" | "organization" => Ok(ProfileKind::Org),
            "location" => Ok(ProfileKind::Location),
            _ => Err(format!("Unknown kind: {}", s)),
        }
    }
}

/// A person's published identity: the content of their contact card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityProfile {
    pub name: String,
    pub contacts: Vec<ContactChannel>,
    pub note: Option<String>,
    pub public_keys: Vec<PublicKey>,

    /// Structured name as `Family;Given`
    pub structured_name: Option<String>,
    pub nickname: Option<String>,
    pub lang: Option<String>,
    pub gender: Option<String>,
    pub categories: Vec<String>,
    pub bday: Option<String>,
    pub anniversary: Option<String>,
    pub kind: Option<ProfileKind>,
    pub adr: Option<String>,
    pub photo: Option<String>,
    pub source: Option<String>,
    pub feeds: Vec<FeedLink>,
    pub endorsements: Vec<Endorsement>,
    pub revocations: Vec<RevokedKey>,
    pub extra: Vec<CustomProperty>,
}

impl IdentityProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_contact(mut self, contact: ContactChannel) -> Self {
        self.contacts.push(contact);
        self
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    pub fn with_key(mut self, key: PublicKey) -> Self {
        self.public_keys.push(key);
        self
    }

    pub fn with_feed(mut self, feed: FeedLink) -> Self {
        self.feeds.push(feed);
        self
    }

    /// The key other people should sign or verify against: lowest PREF wins,
    /// keys without PREF come last in card order.
    pub fn preferred_key(&self) -> Option<&PublicKey> {
        self.public_keys
            .iter()
            .enumerate()
            .min_by_key(|(i, k)| (k.pref.unwrap_or(u8::MAX), *i))
            .map(|(_, k)| k)
    }

    pub fn contacts_of(&self, kind: ChannelKind) -> impl Iterator<Item = &ContactChannel> {
        self.contacts.iter().filter(move |c| c.kind == kind)
    }
}
