//! ledger-cli
//!
//! Small command-line harness exercising selfledger-core end to end:
//! appending events, replaying the ledger, inspecting the RSM snapshot and
//! its diff across two watermarks, and explaining a commitment's thread in
//! the meme graph.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use selfledger_core::{EventLog, MemeGraph, Mirror, SqliteEventLog};
use serde_json::Map;
use tracing_subscriber::EnvFilter;

/// ledger-cli - manual test harness for the selfledger event ledger
#[derive(Parser)]
#[command(name = "ledger-cli")]
#[command(author = "Sam Valladares")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manual test harness for the selfledger event ledger")]
struct Cli {
    /// Path to the SQLite ledger file; defaults to the platform data dir
    #[arg(long, env = "LEDGER_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a new event to the ledger
    Append {
        /// Event kind, e.g. user_message, assistant_message
        kind: String,
        /// Event content
        content: String,
    },

    /// Print every event in the ledger, in order
    Replay,

    /// Print the current RSM snapshot
    Rsm,

    /// Diff the RSM snapshot between two event-id watermarks
    RsmDiff {
        /// Earlier watermark
        a: String,
        /// Later watermark
        b: String,
    },

    /// Print the commitment thread for a commitment id
    GraphExplain {
        /// Commitment id
        cid: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let log = match SqliteEventLog::new(cli.db) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            std::process::exit(1);
        }
    };

    if let Err(message) = run(&log, cli.command) {
        eprintln!("{} {message}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(log: &SqliteEventLog, command: Commands) -> Result<(), String> {
    match command {
        Commands::Append { kind, content } => {
            let event = log.append(&kind, &content, Map::new()).map_err(|e| e.to_string())?;
            println!("appended event {} ({})", event.id, event.kind);
            Ok(())
        }
        Commands::Replay => {
            let events = log.read_all().map_err(|e| e.to_string())?;
            for event in events {
                println!("{:>6}  {:<20}  {}", event.id, event.kind, event.content);
            }
            Ok(())
        }
        Commands::Rsm => {
            let mirror = Mirror::from_log(log).map_err(|e| e.to_string())?;
            let snapshot = mirror.rsm_snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot.to_value()).unwrap());
            Ok(())
        }
        Commands::RsmDiff { a, b } => {
            let a = parse_event_id(&a)?;
            let b = parse_event_id(&b)?;
            let mirror = Mirror::from_log(log).map_err(|e| e.to_string())?;
            let diff = mirror.diff_rsm(a, b).map_err(|e| e.to_string())?;
            println!("RSM Diff ({a} -> {b})");
            println!("  tendencies_delta: {:?}", diff.tendencies_delta);
            println!("  gaps_added: {:?}", diff.gaps_added);
            println!("  gaps_resolved: {:?}", diff.gaps_resolved);
            Ok(())
        }
        Commands::GraphExplain { cid } => {
            let events = log.read_all().map_err(|e| e.to_string())?;
            let graph = MemeGraph::new();
            graph.rebuild(&events);
            let thread = graph.thread_for_cid(&cid);
            println!("thread for {cid}: {thread:?}");
            Ok(())
        }
    }
}

fn parse_event_id(raw: &str) -> Result<i64, String> {
    let value: i64 = raw
        .parse()
        .map_err(|_| "Event ids must be integers.".to_string())?;
    if value < 0 {
        return Err("Event ids must be non-negative integers.".to_string());
    }
    Ok(value)
}
