use super::{Property, VCard, MAX_LINE_OCTETS};

const CRLF: &str = "\r\n";

/// Serializes a card, adding `BEGIN`, `VERSION` and `END`.
pub fn write_card(card: &VCard) -> String {
    let mut out = String::new();
    out.push_str("BEGIN:VCARD");
    out.push_str(CRLF);
    out.push_str("VERSION:4.0");
    out.push_str(CRLF);

    for property in &card.properties {
        if property.name == "VERSION" {
            continue;
        }
        out.push_str(&fold_line(&content_line(property)));
        out.push_str(CRLF);
    }

    out.push_str("END:VCARD");
    out.push_str(CRLF);
    out
}

pub fn content_line(property: &Property) -> String {
    let mut line = property.name.clone();
    for (key, value) in &property.params {
        line.push(';');
        line.push_str(key);
        line.push('=');
        line.push_str(&quote_param(value));
    }
    line.push(':');
    line.push_str(&property.raw_value);
    line
}

fn quote_param(value: &str) -> String {
    if value.contains(|c: char| matches!(c, ';' | ':' | ',')) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

/// Folds a logical line so no physical line exceeds 75 octets. Continuation
/// lines start with one space, and multi-byte characters are never split.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;

    for c in line.chars() {
        let width = c.len_utf8();
        if used + width > budget {
            out.push_str(CRLF);
            out.push(' ');
            // The leading space counts towards the limit.
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        out.push(c);
        used += width;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_minimal_card() {
        let mut card = VCard::default();
        card.push(Property::text("FN", "Alice"));

        assert_eq!(
            write_card(&card),
            "BEGIN:VCARD\r\nVERSION:4.0\r\nFN:Alice\r\nEND:VCARD\r\n"
        );
    }

    #[test]
    fn test_params_are_quoted_when_needed() {
        let prop = Property::new("REVKEY", "AAAA")
            .with_param("REASON", "lost, replaced")
            .with_param("DATE", "2025-01-01");
        assert_eq!(
            content_line(&prop),
            "REVKEY;REASON=\"lost, replaced\";DATE=2025-01-01:AAAA"
        );
    }

    #[test]
    fn test_short_lines_not_folded() {
        assert_eq!(fold_line("FN:Alice"), "FN:Alice");
    }

    #[test]
    fn test_long_lines_folded_within_limit() {
        let line = format!("NOTE:{}", "x".repeat(200));
        let folded = fold_line(&line);

        for physical in folded.split("\r\n") {
            assert!(physical.len() <= MAX_LINE_OCTETS, "{} octets", physical.len());
        }
        assert_eq!(folded.replace("\r\n ", ""), line);
    }

    #[test]
    fn test_folding_respects_char_boundaries() {
        let line = format!("NOTE:{}", "ñ".repeat(100));
        let folded = fold_line(&line);

        for physical in folded.split("\r\n") {
            assert!(physical.len() <= MAX_LINE_OCTETS);
        }
        assert_eq!(folded.replace("\r\n ", ""), line);
    }
}
