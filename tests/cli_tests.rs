use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const HELLO_WORLD: &str = r#"{
  "channel": {"title": "Alice's status", "link": "https://alice.example"},
  "entries": [
    {"ts": "2024-01-01T00:00:00Z", "title": "Hello"},
    {"ts": "2024-01-02T00:00:00Z", "title": "World"}
  ]
}"#;

/// Runs in `dir` with no DSI_* settings leaking in from the environment.
fn dsi_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dsi").unwrap();
    cmd.current_dir(dir);
    for key in [
        "DSI_FEED_TITLE",
        "DSI_FEED_LINK",
        "DSI_FEED_DESCRIPTION",
        "DSI_FEED_LANGUAGE",
        "DSI_AUTHOR_NAME",
        "DSI_AUTHOR_EMAIL",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn entries_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_help_lists_commands() {
    let temp_dir = TempDir::new().unwrap();

    dsi_cmd(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("profile"))
        .stdout(predicate::str::contains("feed"))
        .stdout(predicate::str::contains("qr"))
        .stdout(predicate::str::contains("connections"));
}

mod profile {
    use super::*;

    #[test]
    fn test_alice_card() {
        let temp_dir = TempDir::new().unwrap();

        dsi_cmd(temp_dir.path())
            .args(["profile", "--name", "Alice", "--email", "a@x.com", "-o", "alice.vcf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Profile written to alice.vcf"));

        let card = fs::read_to_string(temp_dir.path().join("alice.vcf")).unwrap();
        assert_eq!(
            card,
            "BEGIN:VCARD\r\nVERSION:4.0\r\nFN:Alice\r\nEMAIL:a@x.com\r\nEND:VCARD\r\n"
        );
    }

    #[test]
    fn test_profile_from_json_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("me.json"),
            r#"{"name": "Alice", "note": "Hi, I write; sometimes", "contacts": [{"type": "social", "platform": "Mastodon", "value": "@alice@example.social"}]}"#,
        )
        .unwrap();

        dsi_cmd(temp_dir.path())
            .args(["profile", "-i", "me.json", "-o", "me.vcf"])
            .assert()
            .success();

        let card = fs::read_to_string(temp_dir.path().join("me.vcf")).unwrap();
        assert!(card.contains("X-SOCIAL;PLATFORM=mastodon:@alice@example.social\r\n"));
        assert!(card.contains("NOTE:Hi\\, I write\\; sometimes\r\n"));
    }

    #[test]
    fn test_identity_detail_flags() {
        let temp_dir = TempDir::new().unwrap();

        dsi_cmd(temp_dir.path())
            .args([
                "profile", "--name", "Alice", "--nickname", "Al", "--kind", "individual",
                "--bday", "1990-05-04", "--category", "writer", "--photo",
                "https://alice.example/me.png", "-o", "alice.vcf",
            ])
            .assert()
            .success();

        let card = fs::read_to_string(temp_dir.path().join("alice.vcf")).unwrap();
        assert!(card.contains("KIND:individual\r\n"));
        assert!(card.contains("BDAY:1990-05-04\r\n"));
        assert!(card.contains("CATEGORIES:writer\r\n"));
        assert!(card.contains("PHOTO:https://alice.example/me.png\r\n"));
        assert!(card.contains("NICKNAME:Al\r\n"));
    }

    #[test]
    fn test_empty_name_is_validation_error() {
        let temp_dir = TempDir::new().unwrap();

        dsi_cmd(temp_dir.path())
            .args(["profile", "--name", "", "-o", "empty.vcf"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::starts_with("ValidationError: name"));

        assert!(!temp_dir.path().join("empty.vcf").exists());
    }

    #[test]
    fn test_unwritable_output_is_io_error() {
        let temp_dir = TempDir::new().unwrap();

        dsi_cmd(temp_dir.path())
            .args(["profile", "--name", "Alice", "-o", "missing/dir/alice.vcf"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::starts_with("IOError"));

        assert!(entries_in(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_generate_key_with_unwritable_card_leaves_no_keys() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("alice.vcf")).unwrap();

        dsi_cmd(temp_dir.path())
            .args(["profile", "--name", "Alice", "--generate-key", "-o", "alice.vcf"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("IOError"));

        assert_eq!(entries_in(temp_dir.path()), vec!["alice.vcf"]);
    }

    #[test]
    fn test_generate_key_then_inspect() {
        let temp_dir = TempDir::new().unwrap();

        dsi_cmd(temp_dir.path())
            .args(["profile", "--name", "Alice", "--generate-key", "-o", "alice.vcf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("KEY: MCowBQYDK2VwAyEA"));

        assert_eq!(
            entries_in(temp_dir.path()),
            vec!["alice.vcf", "alice_private.pem", "alice_public.pem"]
        );
        let card = fs::read_to_string(temp_dir.path().join("alice.vcf")).unwrap();
        assert!(card.contains("KEY;TYPE=public;ALG=ed25519;PREF=1;ENCODING=b:"));

        dsi_cmd(temp_dir.path())
            .args(["inspect", "alice.vcf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Name: Alice"))
            .stdout(predicate::str::contains("(preferred)"));
    }
}

mod feed {
    use super::*;

    #[test]
    fn test_hello_world_rss() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("feed.json"), HELLO_WORLD).unwrap();

        dsi_cmd(temp_dir.path())
            .args(["feed", "-i", "feed.json", "--generated-at", "2024-02-01T12:00:00Z"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Feed written to feed.rss (2 entries, rss)"));

        let xml = fs::read_to_string(temp_dir.path().join("feed.rss")).unwrap();
        let hello = xml.find("<title>Hello</title>").unwrap();
        let world = xml.find("<title>World</title>").unwrap();
        assert!(hello < world);
        assert!(xml.contains("12:00:00 +0000</lastBuildDate>"));

        let parsed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        let titles: Vec<_> = parsed
            .entries
            .iter()
            .map(|e| e.title.as_ref().unwrap().content.clone())
            .collect();
        assert_eq!(titles, vec!["Hello", "World"]);
    }

    #[test]
    fn test_same_input_same_output() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("feed.json"), HELLO_WORLD).unwrap();

        for out in ["a.atom", "b.atom"] {
            dsi_cmd(temp_dir.path())
                .args(["feed", "-i", "feed.json", "-f", "atom", "-o", out])
                .args(["--generated-at", "2024-02-01T12:00:00Z"])
                .assert()
                .success();
        }

        let a = fs::read(temp_dir.path().join("a.atom")).unwrap();
        let b = fs::read(temp_dir.path().join("b.atom")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_feed_is_validation_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("feed.json"),
            r#"{"channel": {"title": "T", "link": "https://t.example"}, "entries": []}"#,
        )
        .unwrap();

        dsi_cmd(temp_dir.path())
            .args(["feed", "-i", "feed.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("ValidationError: entries"));

        assert!(!temp_dir.path().join("feed.rss").exists());
    }

    #[test]
    fn test_out_of_order_names_entry() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("feed.json"),
            r#"{"channel": {"title": "T", "link": "https://t.example"}, "entries": [
                {"ts": "2024-01-02", "title": "Later"},
                {"ts": "2024-01-01", "title": "Earlier"}
            ]}"#,
        )
        .unwrap();

        dsi_cmd(temp_dir.path())
            .args(["feed", "-i", "feed.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("entries[1].timestamp"));
    }

    #[test]
    fn test_channel_from_environment() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("entries.json"),
            r#"[{"ts": "2024-01-01", "title": "Hello"}]"#,
        )
        .unwrap();

        dsi_cmd(temp_dir.path())
            .args(["feed", "-i", "entries.json", "--title", "From flag"])
            .env("DSI_FEED_TITLE", "From env")
            .env("DSI_FEED_LINK", "https://env.example")
            .assert()
            .success();

        let xml = fs::read_to_string(temp_dir.path().join("feed.rss")).unwrap();
        assert!(xml.contains("<title>From flag</title>"));
        assert!(xml.contains("<link>https://env.example</link>"));
    }

    #[test]
    fn test_missing_channel_link() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("entries.json"),
            r#"[{"ts": "2024-01-01", "title": "Hello"}]"#,
        )
        .unwrap();

        dsi_cmd(temp_dir.path())
            .args(["feed", "-i", "entries.json", "--title", "T"])
            .assert()
            .failure()
            .stderr(predicate::str::starts_with("ValidationError: channel.link"));
    }

    #[test]
    fn test_markdown_posts_to_atom() {
        let temp_dir = TempDir::new().unwrap();
        let posts = temp_dir.path().join("posts");

        dsi_cmd(temp_dir.path())
            .args(["post", "-d", "posts", "-t", "First", "-m", "Hello *there*"])
            .args(["--date", "2024-01-01T09:00:00Z", "--filename", "first"])
            .assert()
            .success()
            .stdout(predicate::str::contains("first.md"));
        dsi_cmd(temp_dir.path())
            .args(["post", "-d", "posts", "-t", "Second", "-m", "Again"])
            .args(["--date", "2024-01-02T09:00:00Z"])
            .assert()
            .success();
        assert!(posts.join("2024-01-02t09-00-00z.md").exists());

        dsi_cmd(temp_dir.path())
            .args(["feed", "-d", "posts", "-f", "atom", "-o", "status.atom"])
            .args(["--title", "Status", "--link", "https://alice.example"])
            .assert()
            .success();

        let xml = fs::read_to_string(temp_dir.path().join("status.atom")).unwrap();
        let parsed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].title.as_ref().unwrap().content, "First");
        assert_eq!(parsed.entries[1].title.as_ref().unwrap().content, "Second");
    }

    #[test]
    fn test_signed_rss() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("feed.json"), HELLO_WORLD).unwrap();

        dsi_cmd(temp_dir.path())
            .args(["key", "create", "--priv", "me.key", "--pub", "me.pub"])
            .assert()
            .success();

        dsi_cmd(temp_dir.path())
            .args(["feed", "-i", "feed.json", "--sign-key", "me.key"])
            .assert()
            .success();

        let xml = fs::read_to_string(temp_dir.path().join("feed.rss")).unwrap();
        assert_eq!(xml.matches("<signature keyId=\"MCowBQYDK2VwAyEA").count(), 2);
    }
}

mod post {
    use super::*;

    #[test]
    fn test_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();

        dsi_cmd(temp_dir.path())
            .args(["post", "-m", "one", "--filename", "note"])
            .assert()
            .success();
        dsi_cmd(temp_dir.path())
            .args(["post", "-m", "two", "--filename", "note"])
            .assert()
            .failure()
            .stderr(predicate::str::starts_with("ValidationError"));

        let content = fs::read_to_string(temp_dir.path().join("note.md")).unwrap();
        assert!(content.ends_with("---\none\n"));
    }
}

mod key {
    use super::*;

    #[test]
    fn test_create_encode_decode() {
        let temp_dir = TempDir::new().unwrap();

        let created = dsi_cmd(temp_dir.path())
            .args(["key", "create", "--priv", "me.key", "--pub", "me.pub"])
            .assert()
            .success()
            .stdout(predicate::str::contains("KEY;TYPE=public;ALG=ed25519;ENCODING=b:"))
            .get_output()
            .stdout
            .clone();
        let created = String::from_utf8(created).unwrap();
        let b64 = created
            .lines()
            .find_map(|l| l.strip_prefix("KEY;TYPE=public;ALG=ed25519;ENCODING=b:"))
            .unwrap()
            .to_string();

        dsi_cmd(temp_dir.path())
            .args(["key", "encode", "me.pub"])
            .assert()
            .success()
            .stdout(format!("{}\n", b64));

        let pem = fs::read_to_string(temp_dir.path().join("me.pub")).unwrap();
        dsi_cmd(temp_dir.path())
            .args(["key", "decode", &b64])
            .assert()
            .success()
            .stdout(pem);
    }

    #[test]
    fn test_create_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("me.key"), "keep me").unwrap();

        dsi_cmd(temp_dir.path())
            .args(["key", "create", "--priv", "me.key", "--pub", "me.pub"])
            .assert()
            .failure()
            .stderr(predicate::str::starts_with("ValidationError"));

        assert_eq!(fs::read_to_string(temp_dir.path().join("me.key")).unwrap(), "keep me");
        assert!(!temp_dir.path().join("me.pub").exists());
    }

    #[test]
    fn test_decode_garbage() {
        let temp_dir = TempDir::new().unwrap();

        dsi_cmd(temp_dir.path())
            .args(["key", "decode", "not-base64!"])
            .assert()
            .failure()
            .stderr(predicate::str::starts_with("ValidationError"));
    }

    #[test]
    fn test_endorse_and_verify() {
        let temp_dir = TempDir::new().unwrap();

        dsi_cmd(temp_dir.path())
            .args(["profile", "--name", "Bob", "--generate-key", "-o", "bob.vcf"])
            .assert()
            .success();
        dsi_cmd(temp_dir.path())
            .args(["key", "create", "--priv", "alice.key", "--pub", "alice.pub"])
            .assert()
            .success();

        let output = dsi_cmd(temp_dir.path())
            .args(["key", "endorse", "--priv", "alice.key", "bob.vcf", "--date", "2025-01-01"])
            .assert()
            .success()
            .stdout(predicate::str::contains("X-ENDORSE;SIG="))
            .get_output()
            .stdout
            .clone();
        let output = String::from_utf8(output).unwrap();
        let endorse_line = output.lines().find(|l| l.starts_with("X-ENDORSE")).unwrap();

        // Alice publishes the endorsement in her own card.
        let alice_key = fs::read_to_string(temp_dir.path().join("alice.pub")).unwrap();
        let alice_b64 = alice_key
            .lines()
            .filter(|l| !l.starts_with("-----"))
            .collect::<String>();
        let card = format!(
            "BEGIN:VCARD\r\nVERSION:4.0\r\nFN:Alice\r\nKEY;TYPE=public;ALG=ed25519;ENCODING=b:{}\r\n{}\r\nEND:VCARD\r\n",
            alice_b64, endorse_line
        );
        fs::write(temp_dir.path().join("alice.vcf"), card).unwrap();

        dsi_cmd(temp_dir.path())
            .args(["inspect", "alice.vcf"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[verified] on 2025-01-01"));
    }
}

mod connections {
    use super::*;

    #[test]
    fn test_opml_from_cards() {
        let temp_dir = TempDir::new().unwrap();
        let cards = temp_dir.path().join("cards");
        fs::create_dir(&cards).unwrap();
        fs::write(
            cards.join("bob.vcf"),
            "BEGIN:VCARD\r\nVERSION:4.0\r\nFN:Bob\r\nX-FEED:https://bob.example/feed.rss\r\nEND:VCARD\r\n",
        )
        .unwrap();

        dsi_cmd(temp_dir.path())
            .args(["connections", "cards"])
            .assert()
            .success()
            .stdout(predicate::str::contains("<opml"))
            .stdout(predicate::str::contains("https://bob.example/feed.rss"))
            .stdout(predicate::str::contains("Bob"));

        dsi_cmd(temp_dir.path())
            .args(["connections", "cards", "-o", "friends.opml"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Exported 1 connections to friends.opml"));
        assert!(temp_dir.path().join("friends.opml").exists());
    }
}

mod qr {
    use super::*;

    const CARD: &str = "BEGIN:VCARD\r\nVERSION:4.0\r\nFN:Alice\r\nEND:VCARD\r\n";
    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn test_qr_from_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("alice.vcf"), CARD).unwrap();

        dsi_cmd(temp_dir.path())
            .args(["qr", "alice.vcf", "-o", "alice.png"])
            .assert()
            .success()
            .stdout(predicate::str::contains("QR code written to alice.png"));

        let png = fs::read(temp_dir.path().join("alice.png")).unwrap();
        assert!(png.starts_with(PNG_MAGIC));
    }

    #[test]
    fn test_qr_from_stdin() {
        let temp_dir = TempDir::new().unwrap();

        dsi_cmd(temp_dir.path())
            .args(["qr", "-o", "piped.png"])
            .write_stdin(CARD)
            .assert()
            .success();

        let png = fs::read(temp_dir.path().join("piped.png")).unwrap();
        assert!(png.starts_with(PNG_MAGIC));
    }

    #[test]
    fn test_qr_empty_input_is_validation_error() {
        let temp_dir = TempDir::new().unwrap();

        dsi_cmd(temp_dir.path())
            .args(["qr", "-o", "empty.png"])
            .write_stdin("")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("ValidationError: input"));

        assert!(entries_in(temp_dir.path()).is_empty());
    }
}
