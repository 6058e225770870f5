use super::{escape_structured, escape_text, split_unescaped, unescape_text, Property, VCard};
use crate::domain::{
    ChannelKind, ContactChannel, CustomProperty, Endorsement, FeedLink, IdentityProfile,
    PublicKey, RevokedKey,
};

/// Builds the card for a profile. Property order is stable so identical
/// profiles always produce identical documents.
pub fn profile_to_card(profile: &IdentityProfile) -> VCard {
    let mut card = VCard::default();

    card.push(Property::text("FN", &profile.name));
    if let Some(n) = &profile.structured_name {
        card.push(Property::new("N", escape_structured(n)));
    }
    if let Some(nickname) = &profile.nickname {
        card.push(Property::text("NICKNAME", nickname));
    }
    if let Some(kind) = &profile.kind {
        card.push(Property::new("KIND", kind.as_str()));
    }
    if let Some(gender) = &profile.gender {
        card.push(Property::text("GENDER", gender));
    }
    if let Some(lang) = &profile.lang {
        card.push(Property::new("LANG", lang.as_str()));
    }
    if let Some(bday) = &profile.bday {
        card.push(Property::new("BDAY", bday.as_str()));
    }
    if let Some(anniversary) = &profile.anniversary {
        card.push(Property::new("ANNIVERSARY", anniversary.as_str()));
    }

    for contact in &profile.contacts {
        card.push(contact_property(contact));
    }

    if !profile.categories.is_empty() {
        let joined = profile
            .categories
            .iter()
            .map(|c| escape_text(c))
            .collect::<Vec<_>>()
            .join(",");
        card.push(Property::new("CATEGORIES", joined));
    }
    if let Some(adr) = &profile.adr {
        card.push(Property::new("ADR", escape_structured(adr)));
    }
    if let Some(photo) = &profile.photo {
        card.push(Property::new("PHOTO", photo.as_str()));
    }
    if let Some(note) = &profile.note {
        let mut prop = Property::text("NOTE", note);
        if let Some(lang) = &profile.lang {
            prop = prop.with_param("LANGUAGE", lang.as_str());
        }
        card.push(prop);
    }
    if let Some(source) = &profile.source {
        card.push(Property::new("SOURCE", source.as_str()));
    }

    for key in &profile.public_keys {
        let mut prop = Property::new("KEY", key.key.trim())
            .with_param("TYPE", "public")
            .with_param("ALG", key.alg.as_str());
        if let Some(pref) = key.pref {
            prop = prop.with_param("PREF", pref.to_string());
        }
        card.push(prop.with_param("ENCODING", "b"));
    }

    for feed in &profile.feeds {
        let mut prop = Property::new("X-FEED", feed.url.as_str());
        if let Some(lang) = &feed.language {
            prop = prop.with_param("LANGUAGE", lang.as_str());
        }
        card.push(prop);
    }

    for endorsement in &profile.endorsements {
        card.push(endorsement_property(endorsement));
    }

    for revoked in &profile.revocations {
        let mut prop = Property::new("REVKEY", revoked.key.trim());
        if let Some(reason) = &revoked.reason {
            prop = prop.with_param("REASON", reason.as_str());
        }
        if let Some(date) = &revoked.date {
            prop = prop.with_param("DATE", date.as_str());
        }
        card.push(prop);
    }

    for extra in &profile.extra {
        card.push(Property::text(extra.name.trim(), &extra.value));
    }

    card
}

/// `X-ENDORSE;SIG=<hex>[;DATE=..][;CONFIDENCE=..]:<endorsed key>`
pub fn endorsement_property(endorsement: &Endorsement) -> Property {
    let mut prop = Property::new("X-ENDORSE", endorsement.endorsee_key.trim())
        .with_param("SIG", endorsement.signature.trim());
    if let Some(date) = &endorsement.date {
        prop = prop.with_param("DATE", date.as_str());
    }
    if let Some(confidence) = &endorsement.confidence {
        prop = prop.with_param("CONFIDENCE", confidence.as_str());
    }
    prop
}

fn contact_property(contact: &ContactChannel) -> Property {
    match contact.kind {
        ChannelKind::Email => Property::text("EMAIL", &contact.value),
        ChannelKind::Tel => Property::text("TEL", &contact.value),
        ChannelKind::Impp => Property::new("IMPP", contact.value.as_str()),
        ChannelKind::Url => Property::new("URL", contact.value.as_str()),
        ChannelKind::Social => {
            let platform = contact
                .platform
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_lowercase();
            Property::text("X-SOCIAL", &contact.value).with_param("PLATFORM", platform)
        }
    }
}

/// Reads a profile back out of a card. Unknown standard properties are
/// skipped; unknown `X-` properties land in `extra`.
pub fn profile_from_card(card: &VCard) -> IdentityProfile {
    let mut profile = IdentityProfile::default();

    for prop in &card.properties {
        let raw = prop.raw_value.as_str();
        match prop.name.as_str() {
            "FN" => profile.name = prop.text_value(),
            "N" => profile.structured_name = Some(unescape_text(raw)),
            "NICKNAME" => profile.nickname = Some(prop.text_value()),
            "KIND" => profile.kind = raw.parse().ok(),
            "GENDER" => profile.gender = Some(prop.text_value()),
            "LANG" => profile.lang = Some(raw.trim().to_string()),
            "BDAY" => profile.bday = Some(raw.trim().to_string()),
            "ANNIVERSARY" => profile.anniversary = Some(raw.trim().to_string()),
            "EMAIL" => profile
                .contacts
                .push(ContactChannel::new(ChannelKind::Email, prop.text_value())),
            "TEL" => profile
                .contacts
                .push(ContactChannel::new(ChannelKind::Tel, prop.text_value())),
            "IMPP" => profile
                .contacts
                .push(ContactChannel::new(ChannelKind::Impp, raw)),
            "URL" => profile
                .contacts
                .push(ContactChannel::new(ChannelKind::Url, raw)),
            "X-SOCIAL" => profile.contacts.push(ContactChannel::social(
                prop.param("PLATFORM").unwrap_or_default(),
                prop.text_value(),
            )),
            "CATEGORIES" => profile.categories.extend(
                split_unescaped(raw, ',')
                    .iter()
                    .map(|c| unescape_text(c))
                    .filter(|c| !c.trim().is_empty()),
            ),
            "ADR" => profile.adr = Some(unescape_text(raw)),
            "PHOTO" => profile.photo = Some(raw.to_string()),
            "NOTE" => profile.note = Some(prop.text_value()),
            "SOURCE" => profile.source = Some(raw.to_string()),
            "KEY" => profile.public_keys.push(PublicKey {
                alg: prop.param("ALG").unwrap_or_default().to_string(),
                key: raw.trim().to_string(),
                pref: prop.param("PREF").and_then(|p| p.trim().parse().ok()),
            }),
            "X-FEED" => profile.feeds.push(FeedLink {
                url: raw.trim().to_string(),
                language: prop.param("LANGUAGE").map(str::to_string),
            }),
            "X-ENDORSE" => profile.endorsements.push(Endorsement {
                endorsee_key: raw.trim().to_string(),
                signature: prop.param("SIG").unwrap_or_default().to_string(),
                date: prop.param("DATE").map(str::to_string),
                confidence: prop.param("CONFIDENCE").map(str::to_string),
            }),
            "REVKEY" => profile.revocations.push(RevokedKey {
                key: raw.trim().to_string(),
                reason: prop.param("REASON").map(str::to_string),
                date: prop.param("DATE").map(str::to_string),
            }),
            name if name.starts_with("X-") => profile.extra.push(CustomProperty {
                name: name.to_string(),
                value: prop.text_value(),
            }),
            _ => {}
        }
    }

    profile
}
