use std::fmt::Write as _;

use ed25519_dalek::VerifyingKey;
use tracing::{debug, warn};

use crate::domain::{Endorsement, IdentityProfile};
use crate::errors::DsiResult;
use crate::security::{load_public_key_b64der, verify_endorsement};
use crate::vcard::parse_profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndorsementStatus {
    /// Signed by one of the card's own keys.
    Verified,
    /// Keys are known but none of them produced this signature.
    Unverified,
    /// The card publishes no usable key to check against.
    UnknownSigner,
}

impl EndorsementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndorsementStatus::Verified => "verified",
            EndorsementStatus::Unverified => "unverified",
            EndorsementStatus::UnknownSigner => "unknown signer",
        }
    }
}

#[derive(Debug)]
pub struct InspectReport {
    pub profile: IdentityProfile,
    pub endorsements: Vec<(Endorsement, EndorsementStatus)>,
}

/// Parse a card and check each endorsement against the card's keys plus any
/// extra keys the caller trusts.
pub fn inspect(card_text: &str, extra_keys: &[VerifyingKey]) -> DsiResult<InspectReport> {
    let profile = parse_profile(card_text)?;

    let mut known: Vec<VerifyingKey> = Vec::new();
    for key in &profile.public_keys {
        match load_public_key_b64der(&key.key) {
            Ok(k) => known.push(k),
            Err(e) => warn!(error = %e, "skipping unreadable KEY"),
        }
    }
    known.extend_from_slice(extra_keys);
    debug!(keys = known.len(), endorsements = profile.endorsements.len(), "inspecting card");

    let endorsements = profile
        .endorsements
        .iter()
        .map(|e| {
            let status = if known.is_empty() {
                EndorsementStatus::UnknownSigner
            } else if known
                .iter()
                .any(|k| verify_endorsement(k, &e.endorsee_key, &e.signature))
            {
                EndorsementStatus::Verified
            } else {
                EndorsementStatus::Unverified
            };
            (e.clone(), status)
        })
        .collect();

    Ok(InspectReport {
        profile,
        endorsements,
    })
}

fn short_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    if chars.len() <= 24 {
        chars.into_iter().collect()
    } else {
        let tail: String = chars[chars.len() - 12..].iter().collect();
        format!("...{}", tail)
    }
}

impl InspectReport {
    /// Human readable summary for the terminal.
    pub fn summary(&self) -> String {
        let p = &self.profile;
        let mut out = String::new();

        let _ = writeln!(out, "Name: {}", p.name);
        if let Some(kind) = &p.kind {
            let _ = writeln!(out, "Kind: {}", kind.as_str());
        }
        if let Some(nickname) = &p.nickname {
            let _ = writeln!(out, "Nickname: {}", nickname);
        }
        if let Some(note) = &p.note {
            let _ = writeln!(out, "Note: {}", note);
        }

        if !p.contacts.is_empty() {
            let _ = writeln!(out, "\nContacts:");
            for contact in &p.contacts {
                match &contact.platform {
                    Some(platform) => {
                        let _ = writeln!(out, "  {} ({}): {}", contact.kind, platform, contact.value);
                    }
                    None => {
                        let _ = writeln!(out, "  {}: {}", contact.kind, contact.value);
                    }
                }
            }
        }

        if !p.feeds.is_empty() {
            let _ = writeln!(out, "\nFeeds:");
            for feed in &p.feeds {
                match &feed.language {
                    Some(lang) => {
                        let _ = writeln!(out, "  {} [{}]", feed.url, lang);
                    }
                    None => {
                        let _ = writeln!(out, "  {}", feed.url);
                    }
                }
            }
        }

        if !p.public_keys.is_empty() {
            let _ = writeln!(out, "\nKeys:");
            let preferred = p.preferred_key();
            for key in &p.public_keys {
                let marker = if preferred == Some(key) { " (preferred)" } else { "" };
                let _ = writeln!(out, "  {} {}{}", key.alg, short_key(&key.key), marker);
            }
        }

        if !p.revocations.is_empty() {
            let _ = writeln!(out, "\nRevoked keys:");
            for revoked in &p.revocations {
                let _ = writeln!(
                    out,
                    "  {} {}",
                    short_key(&revoked.key),
                    revoked.reason.as_deref().unwrap_or("")
                );
            }
        }

        if !self.endorsements.is_empty() {
            let _ = writeln!(out, "\nEndorsements:");
            for (endorsement, status) in &self.endorsements {
                let _ = writeln!(
                    out,
                    "  {} [{}]{}",
                    short_key(&endorsement.endorsee_key),
                    status.as_str(),
                    endorsement
                        .date
                        .as_deref()
                        .map(|d| format!(" on {}", d))
                        .unwrap_or_default()
                );
            }
        }

        out
    }
}
