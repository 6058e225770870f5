use super::{mapping, Property, VCard};
use crate::domain::IdentityProfile;
use crate::errors::{DsiError, DsiResult};

/// Joins folded lines back into logical content lines.
pub fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for physical in text.split('\n') {
        let physical = physical.strip_suffix('\r').unwrap_or(physical);

        if let Some(rest) = physical
            .strip_prefix(' ')
            .or_else(|| physical.strip_prefix('\t'))
        {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }

        lines.push(physical.to_string());
    }

    lines.retain(|l| !l.trim().is_empty());
    lines
}

/// Parses one logical content line.
pub fn parse_line(line: &str) -> Option<Property> {
    let colon = find_value_separator(line)?;
    let (head, value) = (&line[..colon], &line[colon + 1..]);

    let mut segments = split_params(head).into_iter();
    let name = segments.next()?.trim().to_string();
    if name.is_empty() {
        return None;
    }
    // Drop a group prefix such as `item1.EMAIL`.
    let name = name.rsplit('.').next().unwrap_or(&name).to_uppercase();

    let params = segments
        .filter(|s| !s.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((k, v)) => (k.trim().to_uppercase(), unquote(v.trim()).to_string()),
            None => ("TYPE".to_string(), segment.trim().to_string()),
        })
        .collect();

    Some(Property {
        name,
        params,
        raw_value: value.to_string(),
    })
}

fn find_value_separator(line: &str) -> Option<usize> {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ':' if !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

fn split_params(head: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in head.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ';' if !quoted => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parses every card in `text`. Lines outside a card are ignored.
pub fn parse_cards(text: &str) -> DsiResult<Vec<VCard>> {
    let mut cards = Vec::new();
    let mut current: Option<VCard> = None;

    for (number, line) in unfold(text).iter().enumerate() {
        let Some(property) = parse_line(line) else {
            if current.is_some() {
                return Err(DsiError::parse(
                    "vCard",
                    format!("malformed content line {}: '{}'", number + 1, line),
                ));
            }
            continue;
        };

        let is_card_marker = property.raw_value.trim().eq_ignore_ascii_case("VCARD");

        if property.name == "BEGIN" && is_card_marker {
            if current.is_some() {
                return Err(DsiError::parse("vCard", "nested BEGIN:VCARD"));
            }
            current = Some(VCard::default());
        } else if property.name == "END" && is_card_marker {
            if let Some(card) = current.take() {
                cards.push(card);
            }
        } else if let Some(card) = current.as_mut() {
            card.push(property);
        }
    }

    if current.is_some() {
        return Err(DsiError::parse("vCard", "missing END:VCARD"));
    }
    Ok(cards)
}

/// Parses the first card in `text` into a profile.
pub fn parse_profile(text: &str) -> DsiResult<IdentityProfile> {
    let cards = parse_cards(text)?;
    let card = cards
        .first()
        .ok_or_else(|| DsiError::parse("vCard", "no BEGIN:VCARD found"))?;
    Ok(mapping::profile_from_card(card))
}
