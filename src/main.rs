use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;
use tracing::warn;

use dsi::cli::{Cli, Commands, FeedArgs, KeyCommands, PostArgs, ProfileArgs, Prompter};
use dsi::config::Config;
use dsi::domain::feed::now_fixed;
use dsi::domain::{parse_timestamp, ChannelDraft, FeedFormat, IdentityProfile};
use dsi::errors::{DsiError, DsiResult};
use dsi::security::{load_public_key_pem, FeedSigner};
use dsi::services::key_service::{decode_public_b64, encode_public_pem, endorse};
use dsi::services::{
    collect_connections, export_opml, inspect, FeedBuilder, KeyService, NewPost, PostService,
    ProfileBuilder, QrService, RenderOptions,
};
use dsi::sources::{load_material, load_profile, EntrySource, FeedMaterial, InputFileSource, MarkdownSource};
use dsi::storage::{DocumentStore, FileStore};
use dsi::vcard::{endorsement_property, parse_profile, writer::content_line};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> DsiResult<()> {
    match cli.command {
        Commands::Profile(args) => cmd_profile(&args),
        Commands::Feed(args) => {
            let config = Config::from_env()?;
            cmd_feed(&args, &config)
        }
        Commands::Post(args) => cmd_post(&args),
        Commands::Inspect { path, trust } => cmd_inspect(&path, &trust),
        Commands::Key(command) => cmd_key(command),
        Commands::Qr {
            input,
            output,
            logo,
        } => cmd_qr(input.as_deref(), &output, logo.as_deref()),
        Commands::Connections { dir, output } => cmd_connections(&dir, output.as_deref()),
    }
}

fn cmd_profile(args: &ProfileArgs) -> DsiResult<()> {
    let base = match &args.input {
        Some(path) => load_profile(path)?,
        None => IdentityProfile::default(),
    };
    let mut profile = args.apply(base)?;

    if args.interactive {
        let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
        profile = prompter.profile(profile)?;
    }

    let builder = ProfileBuilder::new(FileStore::new());

    if args.generate_key {
        let (_, material) = builder.build_with_new_key(&profile, &args.output)?;
        let (private_path, public_path) =
            dsi::services::profile_builder::key_paths(&args.output);
        println!("Private key: {}", private_path.display());
        println!("Public key:  {}", public_path.display());
        println!("KEY: {}", material.public_b64);
    } else {
        builder.build(&profile, &args.output)?;
    }

    println!("Profile written to {}", args.output.display());
    Ok(())
}

fn cmd_feed(args: &FeedArgs, config: &Config) -> DsiResult<()> {
    let source: Option<Box<dyn EntrySource>> = match (&args.input, &args.dir) {
        (Some(path), _) => Some(Box::new(InputFileSource::new(path))),
        (None, Some(dir)) => Some(Box::new(MarkdownSource::new(dir).with_limit(args.limit))),
        (None, None) => None,
    };

    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());

    let material = match source {
        Some(source) => load_material(source.as_ref())?,
        None if args.interactive => FeedMaterial {
            channel: ChannelDraft::default(),
            entries: prompter.entries()?,
        },
        None => {
            return Err(DsiError::InvalidInput(
                "no entries: pass --input, --dir or --interactive".to_string(),
            ))
        }
    };

    let mut draft = args
        .channel_draft()
        .or(material.channel)
        .or(ChannelDraft::from(config));
    if args.interactive {
        draft = prompter.channel(draft)?;
    }
    let channel = draft.resolve()?;

    let generated_at = match &args.generated_at {
        Some(raw) => parse_timestamp(raw).ok_or_else(|| {
            DsiError::validation("generated_at", format!("'{}' is not a valid date-time", raw))
        })?,
        None => now_fixed(),
    };

    let signer = match &args.sign_key {
        Some(path) => Some(FeedSigner::from_pem(&fs::read_to_string(path)?)?),
        None => None,
    };
    if signer.is_some() && args.format == FeedFormat::Atom {
        warn!("item signatures are only written to RSS feeds");
    }

    let options = RenderOptions::new(args.format, generated_at).with_signer(signer.as_ref());
    let output = args.output_path();

    let builder = FeedBuilder::new(FileStore::new());
    builder.build(&channel, &material.entries, &options, &output)?;

    println!(
        "Feed written to {} ({} entries, {})",
        output.display(),
        material.entries.len(),
        args.format
    );
    Ok(())
}

fn cmd_post(args: &PostArgs) -> DsiResult<()> {
    let service = PostService::new(FileStore::new());
    let post = NewPost {
        title: args.title.clone(),
        message: args.message.clone(),
        date: args.date.clone(),
        filename: args.filename.clone(),
    };

    fs::create_dir_all(&args.dir)?;
    let path = service.create(&args.dir, &post, Utc::now())?;
    println!("Post created: {}", path.display());
    Ok(())
}

fn cmd_inspect(path: &Path, trust: &[PathBuf]) -> DsiResult<()> {
    let text = fs::read_to_string(path)?;

    let mut trusted = Vec::new();
    for key_path in trust {
        trusted.push(load_public_key_pem(&fs::read_to_string(key_path)?)?);
    }

    let report = inspect(&text, &trusted)?;
    print!("{}", report.summary());
    Ok(())
}

fn cmd_key(command: KeyCommands) -> DsiResult<()> {
    match command {
        KeyCommands::Create { private, public } => {
            let service = KeyService::new(FileStore::new());
            let material = service.create(&private, &public)?;

            println!("Private key written to {}", private.display());
            println!("Public key written to {}", public.display());
            println!("Add to your vCard:");
            println!("KEY;TYPE=public;ALG=ed25519;ENCODING=b:{}", material.public_b64);
        }
        KeyCommands::Encode { path } => {
            println!("{}", encode_public_pem(&fs::read_to_string(&path)?)?);
        }
        KeyCommands::Decode { key } => {
            print!("{}", decode_public_b64(&key)?);
        }
        KeyCommands::Endorse {
            private,
            card,
            date,
            confidence,
        } => {
            let endorsee = parse_profile(&fs::read_to_string(&card)?)?;
            let endorsement = endorse(&fs::read_to_string(&private)?, &endorsee, date, confidence)?;

            println!("Add to your vCard to endorse {}:", endorsee.name);
            println!("{}", content_line(&endorsement_property(&endorsement)));
        }
    }
    Ok(())
}

fn cmd_qr(input: Option<&Path>, output: &Path, logo: Option<&Path>) -> DsiResult<()> {
    let data = match input {
        Some(path) => fs::read_to_string(path)?,
        None if !io::stdin().is_terminal() => {
            let mut data = String::new();
            io::stdin().read_to_string(&mut data)?;
            data
        }
        None => {
            return Err(DsiError::InvalidInput(
                "no input: pass a vCard file or pipe one in".to_string(),
            ))
        }
    };

    QrService::new(FileStore::new()).create(&data, logo, output)?;
    println!("QR code written to {}", output.display());
    Ok(())
}

fn cmd_connections(dir: &Path, output: Option<&Path>) -> DsiResult<()> {
    let result = collect_connections(dir)?;

    for (path, error) in &result.skipped {
        eprintln!("Skipped {}: {}", path.display(), error);
    }

    let opml = export_opml(&result.connections)?;

    match output {
        Some(path) => {
            FileStore::new().write(path, opml.as_bytes())?;
            println!(
                "Exported {} connections to {}",
                result.connections.len(),
                path.display()
            );
        }
        None => {
            println!("{}", opml);
        }
    }

    Ok(())
}
