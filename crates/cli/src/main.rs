//! dripfeed CLI - inspect and drive a time-gated unlock track.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use dripfeed_core::{ItemState, Time, UnlockSnapshot};
use dripfeed_progress::{
    EngineConfig, MarkOutcome, UnlockEstimator, UnlockProgressEngine, DEFAULT_STORAGE_KEY,
};
use dripfeed_storage::JsonFileStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dripfeed")]
#[command(about = "Time-gated sequential unlock tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding progress records
    #[arg(short, long, global = true, default_value = ".dripfeed")]
    storage: std::path::PathBuf,

    /// Seconds between a completion and the next unlock
    #[arg(long, global = true, default_value = "300")]
    interval: u64,

    /// Name of the progress record
    #[arg(long, global = true, default_value = DEFAULT_STORAGE_KEY)]
    key: String,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show unlock progress
    Status {
        /// Number of items in the track
        #[arg(long)]
        total: usize,
        /// Evaluate at this RFC 3339 time instead of now
        #[arg(long, value_parser = parse_time)]
        at: Option<Time>,
    },
    /// Mark an item completed
    Complete {
        /// Zero-based item index
        index: usize,
        /// Number of items in the track
        #[arg(long)]
        total: usize,
        /// Record the completion at this RFC 3339 time instead of now
        #[arg(long, value_parser = parse_time)]
        at: Option<Time>,
    },
    /// Restore initial progress
    Reset {
        /// Number of items in the track
        #[arg(long)]
        total: usize,
    },
    /// Poll progress and print changes until interrupted
    Watch {
        /// Number of items in the track
        #[arg(long)]
        total: usize,
        /// Seconds between polls
        #[arg(long, default_value = "5")]
        poll: u64,
    },
}

fn parse_time(s: &str) -> Result<Time, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn engine_config(cli: &Cli) -> Result<EngineConfig> {
    let interval = Duration::from_std(std::time::Duration::from_secs(cli.interval))
        .context("unlock interval out of range")?;
    Ok(EngineConfig::default()
        .with_unlock_interval(interval)
        .with_storage_key(cli.key.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = engine_config(&cli)?;
    let estimator = UnlockEstimator::new(config.unlock_interval);
    let store = JsonFileStore::new(&cli.storage)
        .await
        .with_context(|| format!("opening storage at {}", cli.storage.display()))?;
    let engine = UnlockProgressEngine::new(store, config).await?;

    match cli.command {
        Commands::Status { total, at } => {
            let now = at.unwrap_or_else(Utc::now);
            let snapshot = engine.snapshot(total, now).await;
            print_snapshot(&snapshot, &estimator, now, cli.json)?;
        }
        Commands::Complete { index, total, at } => {
            let now = at.unwrap_or_else(Utc::now);
            let outcome = engine.mark_completed(index, total, now).await;
            if !cli.json {
                println!("{}", outcome_message(outcome, index));
            }
            let snapshot = engine.snapshot(total, now).await;
            print_snapshot(&snapshot, &estimator, now, cli.json)?;
        }
        Commands::Reset { total } => {
            let snapshot = engine.reset(total, Utc::now()).await;
            if !cli.json {
                println!("Progress reset");
            }
            print_snapshot(&snapshot, &estimator, Utc::now(), cli.json)?;
        }
        Commands::Watch { total, poll } => {
            let mut events = engine.subscribe();
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(poll.max(1)));
            info!("Watching {} items, polling every {}s", total, poll.max(1));

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => {
                        engine.snapshot(total, Utc::now()).await;
                    }
                    event = events.recv() => match event {
                        Ok(event) if cli.json => println!("{}", serde_json::to_string(&event)?),
                        Ok(event) => println!(
                            "{} {}: {}/{} unlocked",
                            event.timestamp.to_rfc3339(),
                            event.kind,
                            event.snapshot.unlocked_count,
                            event.snapshot.total_items
                        ),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            info!("Skipped {} progress events", n);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        }
    }

    Ok(())
}

fn outcome_message(outcome: MarkOutcome, index: usize) -> String {
    match outcome {
        MarkOutcome::Recorded => format!("Completed item {}", index),
        MarkOutcome::Locked => format!("Item {} is still locked", index),
        MarkOutcome::Stale => format!("Item {} is behind the last completion; kept", index),
        MarkOutcome::Empty => "Track has no items".to_string(),
    }
}

fn print_snapshot(
    snapshot: &UnlockSnapshot,
    estimator: &UnlockEstimator,
    now: Time,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    println!("Unlocked: {}/{}", snapshot.unlocked_count, snapshot.total_items);
    match (snapshot.last_completed_index, snapshot.last_completion_date) {
        (Some(index), Some(at)) => println!("Last completed: item {} at {}", index, at.to_rfc3339()),
        _ => println!("Last completed: none"),
    }
    if let (Some(at), Some(left)) = (snapshot.next_unlock_date, snapshot.time_until_next_unlock(now)) {
        println!("Next unlock: {} (in {}s)", at.to_rfc3339(), left.num_seconds());
    }
    if let Some(done) = estimator.estimate_full_unlock(snapshot, now) {
        println!("All unlocked at the earliest: {}", done.to_rfc3339());
    }

    for (i, state) in snapshot.items().into_iter().enumerate() {
        let marker = match state {
            ItemState::Completed => "x",
            ItemState::Unlocked => " ",
            ItemState::Locked => "-",
        };
        println!("  [{}] {:>3} {}", marker, i, state);
    }
    Ok(())
}
