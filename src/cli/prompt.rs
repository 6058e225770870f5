use std::io::{BufRead, Write};

use crate::domain::{ChannelDraft, ChannelKind, ContactChannel, FeedEntry, IdentityProfile};
use crate::errors::{DsiError, DsiResult};
use crate::sources::markdown::markdown_to_html;

/// Line-based prompts on any reader/writer pair, so tests can script them.
pub struct Prompter<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// One trimmed line; `None` when the answer is empty.
    pub fn ask(&mut self, label: &str) -> DsiResult<Option<String>> {
        write!(self.output, "{}: ", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(DsiError::InvalidInput(format!(
                "input ended while asking for {}",
                label
            )));
        }

        let answer = line.trim();
        Ok(if answer.is_empty() {
            None
        } else {
            Some(answer.to_string())
        })
    }

    /// Repeats the question until a non-empty answer is given.
    pub fn ask_required(&mut self, label: &str) -> DsiResult<String> {
        loop {
            if let Some(answer) = self.ask(label)? {
                return Ok(answer);
            }
            writeln!(self.output, "  {} is required.", label)?;
        }
    }

    /// Fill the gaps of a profile: name is required, contacts optional.
    pub fn profile(&mut self, mut profile: IdentityProfile) -> DsiResult<IdentityProfile> {
        if profile.name.trim().is_empty() {
            profile.name = self.ask_required("Full name")?;
        }

        if profile.contacts.is_empty() {
            let questions = [
                (ChannelKind::Email, "Email (blank to skip)"),
                (ChannelKind::Tel, "Phone (blank to skip)"),
                (ChannelKind::Url, "Website (blank to skip)"),
            ];
            for (kind, label) in questions {
                if let Some(value) = self.ask(label)? {
                    profile.contacts.push(ContactChannel::new(kind, value));
                }
            }
        }

        if profile.note.is_none() {
            profile.note = self.ask("Short bio (blank to skip)")?;
        }

        Ok(profile)
    }

    /// Ask for the required channel fields that are still missing.
    pub fn channel(&mut self, mut draft: ChannelDraft) -> DsiResult<ChannelDraft> {
        for field in draft.missing() {
            match field {
                "title" => draft.title = Some(self.ask_required("Feed title")?),
                "link" => draft.link = Some(self.ask_required("Site link (https://...)")?),
                _ => {}
            }
        }
        if draft.description.is_none() {
            draft.description = self.ask("Feed description (blank to skip)")?;
        }
        Ok(draft)
    }

    /// Entries until a blank title. Entries are taken in the order given.
    pub fn entries(&mut self) -> DsiResult<Vec<FeedEntry>> {
        writeln!(self.output, "Enter entries oldest first; leave the title blank to finish.")?;

        let mut entries = Vec::new();
        while let Some(title) = self.ask("Title")? {
            let timestamp = self.ask_required("Date (YYYY-MM-DD or RFC 3339)")?;
            let body = self.ask("Text (Markdown, blank to skip)")?;
            let link = self.ask("Link (blank to skip)")?;

            entries.push(
                FeedEntry::new(timestamp, title)
                    .with_body(body.as_deref().map(markdown_to_html))
                    .with_link(link),
            );
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(script: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(script.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_required_repeats_until_answered() {
        let mut p = prompter("\n  \nAlice\n");
        assert_eq!(p.ask_required("Full name").unwrap(), "Alice");

        let shown = String::from_utf8(p.output).unwrap();
        assert_eq!(shown.matches("Full name is required.").count(), 2);
    }

    #[test]
    fn test_eof_is_an_error() {
        let mut p = prompter("");
        assert!(matches!(p.ask("Name"), Err(DsiError::InvalidInput(_))));
    }

    #[test]
    fn test_profile_prompts() {
        let mut p = prompter("Alice\na@x.com\n\n\nHello\n");
        let profile = p.profile(IdentityProfile::default()).unwrap();

        assert_eq!(profile.name, "Alice");
        assert_eq!(profile.contacts, vec![ContactChannel::new(ChannelKind::Email, "a@x.com")]);
        assert_eq!(profile.note.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_profile_skips_known_fields() {
        let mut p = prompter("\n");
        let profile = p
            .profile(
                IdentityProfile::new("Bob")
                    .with_contact(ContactChannel::new(ChannelKind::Tel, "+1 555 0100")),
            )
            .unwrap();
        assert_eq!(profile.name, "Bob");
        assert!(profile.note.is_none());
    }

    #[test]
    fn test_channel_prompts_only_missing() {
        let mut p = prompter("https://alice.example\n\n");
        let draft = ChannelDraft {
            title: Some("Status".into()),
            ..Default::default()
        };
        let draft = p.channel(draft).unwrap();
        assert_eq!(draft.title.as_deref(), Some("Status"));
        assert_eq!(draft.link.as_deref(), Some("https://alice.example"));
        assert!(draft.description.is_none());
    }

    #[test]
    fn test_entries() {
        let mut p = prompter(
            "Hello\n2024-01-01\n*hi*\n\nWorld\n2024-01-02\n\nhttps://alice.example/w\n\n",
        );
        let entries = p.entries().unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].body.as_deref(), Some("<p><em>hi</em></p>\n"));
        assert_eq!(entries[1].link.as_deref(), Some("https://alice.example/w"));
    }
}
