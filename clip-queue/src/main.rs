//! clip-queue - Inspect and repair the clip queue
//!
//! Unix-style tool for looking at the queue record that clip-post consumes.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use libclipcast::config::Config;
use libclipcast::logging;
use libclipcast::selector::select_next;
use libclipcast::store::{JsonFileStore, QueueStats, QueueStorage};
use libclipcast::types::Item;
use libclipcast::{ClipcastError, Result};

#[derive(Parser, Debug)]
#[command(name = "clip-queue")]
#[command(version)]
#[command(about = "Inspect and repair the clip queue")]
#[command(long_about = "\
clip-queue - Inspect and repair the clip queue

DESCRIPTION:
    clip-queue reads the queue record used by clip-post. Use it to list clips,
    see how many are left, check which clip goes out next, or put a clip
    back in the queue.

COMMANDS:
    list   List all clips in queue order
    stats  Show counts of posted and remaining clips
    next   Show the clip the next clip-post run will publish
    reset  Mark a posted clip as unposted again

USAGE EXAMPLES:
    # List all clips
    clip-queue list

    # Only clips that are still waiting
    clip-queue list --pending

    # Statistics as JSON
    clip-queue stats --format json

    # Re-queue a clip after deleting its post
    clip-queue reset 042 --force

CONFIGURATION:
    Configuration file: ~/.config/clipcast/config.toml
    Queue record:       ~/.local/share/clipcast/videos.json

    Override with environment variables:
        CLIPCAST_CONFIG    - Path to config file

EXIT CODES:
    0 - Success
    1 - Operation failed (queue record missing or unwritable)
    3 - Invalid input (unknown clip id, corrupt queue, etc.)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Queue record to use (overrides queue.path)
    #[arg(short, long, global = true)]
    queue: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    #[arg(help = "Enable verbose logging to stderr (useful for debugging)")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List clips in queue order
    List {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Only show clips that have not been posted
        #[arg(short, long)]
        pending: bool,
    },

    /// Show queue statistics
    Stats {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the next clip to be posted
    Next {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Mark a posted clip as unposted
    Reset {
        /// Clip ID to reset
        id: String,

        /// Required: the clip will be posted again by the next run
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    logging::init_default(cli.verbose);

    // Run the main logic and handle errors
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    let queue_path = cli.queue.unwrap_or_else(|| config.queue_path());
    let store = JsonFileStore::new(queue_path);

    match cli.command {
        Commands::List { format, pending } => cmd_list(&store, &format, pending),
        Commands::Stats { format } => cmd_stats(&store, &format),
        Commands::Next { format } => cmd_next(&store, &format),
        Commands::Reset { id, force } => cmd_reset(&store, &id, force),
    }
}

fn validate_format(format: &str) -> Result<()> {
    if format != "text" && format != "json" {
        return Err(ClipcastError::InvalidInput(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            format
        )));
    }
    Ok(())
}

fn item_json(item: &Item) -> serde_json::Value {
    serde_json::json!({
        "id": item.id,
        "filename": item.filename,
        "character": item.character,
        "quote": item.quote,
        "posted": item.posted,
        "post_date": item.post_date,
    })
}

/// List clips
fn cmd_list(store: &dyn QueueStorage, format: &str, pending: bool) -> Result<()> {
    validate_format(format)?;

    let queue = store.load()?;
    let items: Vec<&Item> = queue
        .items()
        .iter()
        .filter(|item| !pending || !item.posted)
        .collect();

    if format == "json" {
        let json: Vec<serde_json::Value> = items.iter().map(|item| item_json(item)).collect();
        println!("{}", serde_json::Value::Array(json));
        return Ok(());
    }

    for item in items {
        let status = match item.post_date {
            Some(date) => format!("posted {}", date.format("%Y-%m-%d %H:%M")),
            None => "pending".to_string(),
        };
        println!(
            "{} | {} | {} | {}",
            item.id,
            status,
            item.character,
            truncate_content(&item.quote, 50)
        );
    }

    Ok(())
}

/// Show queue statistics
fn cmd_stats(store: &dyn QueueStorage, format: &str) -> Result<()> {
    validate_format(format)?;

    let stats = store.load()?.stats();

    if format == "json" {
        println!("{}", serde_json::json!(stats));
    } else {
        output_stats_text(&stats);
    }

    Ok(())
}

fn output_stats_text(stats: &QueueStats) {
    println!("Total:     {}", stats.total);
    println!("Posted:    {}", stats.posted);
    println!("Remaining: {}", stats.remaining);
    println!("Next:      {}", stats.next_id.as_deref().unwrap_or("-"));

    match (&stats.last_posted_id, stats.last_posted_at) {
        (Some(id), Some(at)) => println!("Last:      {} at {}", id, at.to_rfc3339()),
        _ => println!("Last:      -"),
    }
}

/// Show the next clip
fn cmd_next(store: &dyn QueueStorage, format: &str) -> Result<()> {
    validate_format(format)?;

    let queue = store.load()?;
    let next = select_next(&queue);

    if format == "json" {
        let json = next.map(item_json).unwrap_or(serde_json::Value::Null);
        println!("{}", json);
        return Ok(());
    }

    match next {
        Some(item) => {
            println!("{} | {}", item.id, item.filename);
            println!("{}", item.caption());
        }
        None => println!("Nothing to post"),
    }

    Ok(())
}

/// Put a posted clip back in the queue
fn cmd_reset(store: &dyn QueueStorage, id: &str, force: bool) -> Result<()> {
    if !force {
        return Err(ClipcastError::InvalidInput(format!(
            "Resetting '{}' means the next run posts it again. Re-run with --force to confirm",
            id
        )));
    }

    let mut queue = store.load()?;
    if !queue.reset(id)? {
        println!("{} is not posted; nothing to reset", id);
        return Ok(());
    }

    store.save(&queue)?;
    tracing::info!(item_id = %id, "Reset clip to unposted");
    println!("Reset {}", id);
    Ok(())
}

/// Truncate content to max length with ellipsis
fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
