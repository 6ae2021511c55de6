//! clip-post - Post the next queued clip to Bluesky
//!
//! Runs once and exits: cron or a systemd timer decides how often.

use std::path::PathBuf;

use clap::Parser;
use libclipcast::config::{Config, Credentials, RunConfig};
use libclipcast::coordinator::{preview, Preview, RunCoordinator, RunOutcome};
use libclipcast::logging;
use libclipcast::platforms::bluesky::BlueskyClient;
use libclipcast::store::JsonFileStore;
use libclipcast::{ClipcastError, Result};

#[derive(Parser, Debug)]
#[command(name = "clip-post")]
#[command(version)]
#[command(about = "Post the next queued video clip to Bluesky")]
#[command(long_about = "\
clip-post - Post the next queued video clip to Bluesky

DESCRIPTION:
    clip-post reads the clip queue, picks the first clip that has not been
    posted, uploads it to Bluesky with its quote as the caption, and marks it
    as posted. Each invocation posts at most one clip. When every clip has
    been posted it exits successfully without doing anything.

USAGE EXAMPLES:
    # Post the next clip
    CLIPCAST_IDENTIFIER=me.bsky.social CLIPCAST_APP_PASSWORD=xxxx clip-post

    # See what would be posted, without logging in
    clip-post --dry-run

    # Machine-readable result
    clip-post --format json

CONFIGURATION:
    Configuration file: ~/.config/clipcast/config.toml
    Queue record:       ~/.local/share/clipcast/videos.json
    Media directory:    ~/.local/share/clipcast/videos

    Override with environment variables:
        CLIPCAST_CONFIG        - Path to config file
        CLIPCAST_IDENTIFIER    - Bluesky handle or DID
        CLIPCAST_APP_PASSWORD  - Bluesky app password
        CLIPCAST_LOG_FORMAT    - Log format (text, json, pretty)
        CLIPCAST_LOG_LEVEL     - Log level (error, warn, info, debug, trace)

EXIT CODES:
    0 - Clip posted, or nothing left to post
    1 - Queue, upload, or submission failure
    2 - Authentication failed
    3 - Invalid input (missing credentials, corrupt queue, missing clip)
    4 - Clip posted but the queue could not be updated; mark it by hand
")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Queue record to read (overrides queue.path)
    #[arg(short, long)]
    queue: Option<PathBuf>,

    /// Directory holding the clips (overrides media.dir)
    #[arg(short, long)]
    media_dir: Option<PathBuf>,

    /// Bluesky handle or DID
    #[arg(short, long, env = "CLIPCAST_IDENTIFIER")]
    identifier: Option<String>,

    /// Bluesky app password (environment only)
    #[arg(long, env = "CLIPCAST_APP_PASSWORD", hide = true, hide_env_values = true)]
    app_password: Option<String>,

    /// Show what would be posted without logging in or writing anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    logging::init_default(cli.verbose);

    // Run the main logic and handle errors
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.format != "text" && cli.format != "json" {
        return Err(ClipcastError::InvalidInput(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            cli.format
        )));
    }

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(queue) = &cli.queue {
        config.queue.path = queue.to_string_lossy().to_string();
    }
    if let Some(media_dir) = &cli.media_dir {
        config.media.dir = media_dir.to_string_lossy().to_string();
    }

    tracing::debug!(
        queue = %config.queue_path().display(),
        media_dir = %config.media_dir().display(),
        service = %config.bluesky.service,
        dry_run = cli.dry_run,
        "Resolved configuration"
    );

    if cli.dry_run {
        return cmd_dry_run(&config, &cli.format).await;
    }

    let credentials = credentials(cli.identifier, cli.app_password)?;
    let client = BlueskyClient::from_config(&config.bluesky)?;
    let mut coordinator =
        RunCoordinator::new(RunConfig::from_config(&config, credentials), Box::new(client));

    let outcome = coordinator.run_once().await?;
    output_outcome(&outcome, &cli.format);
    Ok(())
}

fn credentials(identifier: Option<String>, app_password: Option<String>) -> Result<Credentials> {
    let identifier = identifier
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            ClipcastError::InvalidInput(
                "No Bluesky identifier. Pass --identifier or set CLIPCAST_IDENTIFIER".to_string(),
            )
        })?;
    let app_password = app_password.filter(|s| !s.is_empty()).ok_or_else(|| {
        ClipcastError::InvalidInput("No app password. Set CLIPCAST_APP_PASSWORD".to_string())
    })?;

    Ok(Credentials::new(identifier.trim(), app_password))
}

/// Load, select and resolve media without credentials or network
async fn cmd_dry_run(config: &Config, format: &str) -> Result<()> {
    let store = JsonFileStore::new(config.queue_path());
    let preview = preview(&store, &config.media_settings()).await?;
    if let Preview::Ready { item, .. } = &preview {
        tracing::info!(item_id = %item.id, "Dry run; nothing was published");
    }

    if format == "json" {
        let json = match &preview {
            Preview::NothingToPost => serde_json::json!({ "status": "nothing_to_post" }),
            Preview::Ready {
                item,
                media,
                caption,
            } => serde_json::json!({
                "status": "dry_run",
                "item_id": item.id,
                "media": media.path,
                "mime_type": media.mime_type.as_str(),
                "size": media.size,
                "caption": caption,
                "alt_text": item.alt_text(),
            }),
        };
        println!("{}", json);
        return Ok(());
    }

    match preview {
        Preview::NothingToPost => println!("Nothing to post"),
        Preview::Ready {
            item,
            media,
            caption,
        } => {
            println!(
                "Would post {} ({}, {} bytes, {})",
                item.id,
                media.path.display(),
                media.size,
                media.mime_type
            );
            println!("{}", caption);
        }
    }
    Ok(())
}

fn output_outcome(outcome: &RunOutcome, format: &str) {
    if format == "json" {
        let json = match outcome {
            RunOutcome::NothingToPost => serde_json::json!({
                "status": "nothing_to_post",
                "item_id": null,
                "uri": null,
                "cid": null,
            }),
            RunOutcome::Posted { item_id, post, .. } => serde_json::json!({
                "status": "posted",
                "item_id": item_id,
                "uri": post.uri,
                "cid": post.cid,
            }),
        };
        println!("{}", json);
        return;
    }

    match outcome {
        RunOutcome::NothingToPost => println!("Nothing to post"),
        RunOutcome::Posted { item_id, post, .. } => println!("Posted {}: {}", item_id, post.uri),
    }
}
