//! Minimal vCard 4.0 (RFC 6350) content-line codec and the mapping between
//! cards and [`IdentityProfile`](crate::domain::IdentityProfile).

pub mod writer;
pub mod parser;
pub mod mapping;

pub use mapping::{endorsement_property, profile_from_card, profile_to_card};
pub use parser::{parse_cards, parse_profile};
pub use writer::write_card;

/// Longest physical line, in octets, before folding.
pub const MAX_LINE_OCTETS: usize = 75;

/// One content line: `NAME;PARAM=value:value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub params: Vec<(String, String)>,
    /// Value as it appears on the wire, still escaped.
    pub raw_value: String,
}

impl Property {
    pub fn new(name: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_uppercase(),
            params: Vec::new(),
            raw_value: raw_value.into(),
        }
    }

    pub fn text(name: impl Into<String>, value: &str) -> Self {
        Self::new(name, escape_text(value))
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into().to_uppercase(), value.into()));
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn text_value(&self) -> String {
        unescape_text(&self.raw_value)
    }
}

/// A single `BEGIN:VCARD` .. `END:VCARD` block, without the delimiters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VCard {
    pub properties: Vec<Property>,
}

impl VCard {
    pub fn push(&mut self, property: Property) {
        self.properties.push(property);
    }

    pub fn first(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Property> + 'a {
        self.properties
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Escapes a TEXT value.
pub fn escape_text(value: &str) -> String {
    let normalized = value.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(normalized.len());
    for c in normalized.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes a compound value whose `;` are component separators.
pub fn escape_structured(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Splits on `sep` where it is not preceded by a backslash escape.
pub fn split_unescaped(raw: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in raw.chars() {
        if escaped {
            current.push('\\');
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if escaped {
        current.push('\\');
    }
    parts.push(current);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text_specials() {
        assert_eq!(escape_text("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
        assert_eq!(escape_text("line\r\nnext"), "line\\nnext");
    }

    #[test]
    fn test_unescape_reverses_escape() {
        let original = "Hi, I'm Alice; I like \\ and\nnewlines";
        assert_eq!(unescape_text(&escape_text(original)), original);
    }

    #[test]
    fn test_structured_keeps_separators() {
        assert_eq!(escape_structured(";;Main St, 1;Town"), ";;Main St\\, 1;Town");
    }

    #[test]
    fn test_split_unescaped() {
        assert_eq!(
            split_unescaped("rust\\,go,python", ','),
            vec!["rust\\,go".to_string(), "python".to_string()]
        );
        assert_eq!(split_unescaped("", ','), vec![String::new()]);
    }

    #[test]
    fn test_property_param_lookup_is_case_insensitive() {
        let prop = Property::new("key", "AAAA").with_param("alg", "ed25519");
        assert_eq!(prop.name, "KEY");
        assert_eq!(prop.param("ALG"), Some("ed25519"));
        assert_eq!(prop.param("pref"), None);
    }
}
