use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tally_core::{
    FileTokenStore, PageViewTracker, TokenSource, TrackOutcome, TrafficSummary, VisitorIdentity,
};
use tally_storage::{CounterStore, SqliteCounterStore};
use tracing_subscriber::EnvFilter;

mod client;
mod render;

use client::HubClient;
use render::render_summary;

const DEFAULT_HUB_URL: &str = "http://127.0.0.1:8787";

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Page-view tracking client and traffic reports", long_about = None)]
struct Cli {
    /// Log tracker decisions to stderr
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post page views for this client's visitor token
    Track {
        /// Paths in navigation order; a path equal to the previous one is skipped
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long, env = "TALLY_HUB_URL", default_value = DEFAULT_HUB_URL)]
        hub: String,
        #[arg(long)]
        identity_file: Option<PathBuf>,
    },
    /// Print this client's visitor token
    Whoami {
        #[arg(long)]
        identity_file: Option<PathBuf>,
    },
    /// Fetch the traffic summary from a running hub
    Summary {
        #[arg(long, env = "TALLY_HUB_URL", default_value = DEFAULT_HUB_URL)]
        hub: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Build the traffic summary straight from a counter database
    Report {
        #[arg(long, env = "TALLY_DB")]
        db: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_writer(std::io::stderr)
            .try_init();
    }

    match cli.command {
        Commands::Track {
            paths,
            hub,
            identity_file,
        } => {
            let store = FileTokenStore::new(resolve_identity_file(identity_file)?);
            let identity = VisitorIdentity::resolve(&store);
            if identity.source == TokenSource::Ephemeral {
                eprintln!(
                    "warning: could not persist visitor token at {}",
                    store.path().display()
                );
            }

            let mut tracker = PageViewTracker::new(identity.token, HubClient::new(&hub)?);
            for path in &paths {
                match tracker.record(path) {
                    TrackOutcome::Sent => println!("sent      {path}"),
                    TrackOutcome::Duplicate => println!("skipped   {path} (same as previous)"),
                    TrackOutcome::Rejected(error) => println!("degraded  {path}: {error}"),
                    TrackOutcome::Failed(error) => println!("failed    {path}: {error}"),
                }
            }
        }
        Commands::Whoami { identity_file } => {
            let store = FileTokenStore::new(resolve_identity_file(identity_file)?);
            let identity = VisitorIdentity::resolve(&store);
            println!("{} ({})", identity.token, source_label(identity.source));
        }
        Commands::Summary { hub, limit, json } => {
            let summary = HubClient::new(&hub)?.summary(limit)?;
            print_summary(&summary, json)?;
        }
        Commands::Report { db, limit, json } => {
            let summary = read_report(&db, limit)?;
            print_summary(&summary, json)?;
        }
    }

    Ok(())
}

fn resolve_identity_file(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    let base = dirs::data_dir().context("No data directory for this user")?;
    Ok(base.join("tally").join("visitor-id"))
}

fn source_label(source: TokenSource) -> &'static str {
    match source {
        TokenSource::Persisted => "persisted",
        TokenSource::Generated => "new",
        TokenSource::Ephemeral => "not persisted",
    }
}

fn read_report(db: &Path, limit: Option<usize>) -> Result<TrafficSummary> {
    if !db.exists() {
        anyhow::bail!("No counter database at {:?}", db);
    }
    let store = SqliteCounterStore::open(db)
        .with_context(|| format!("Failed to open counter database {:?}", db))?;
    let mut summary = TrafficSummary::from_counts(
        store.page_counts().context("Failed to read page counters")?,
        store.day_counts().context("Failed to read day counters")?,
        store
            .visitor_count()
            .context("Failed to count visitors")?,
    );
    if let Some(limit) = limit {
        summary.truncate_top_pages(limit);
    }
    Ok(summary)
}

fn print_summary(summary: &TrafficSummary, json: bool) -> Result<()> {
    if json {
        let text =
            serde_json::to_string_pretty(summary).context("Failed to encode traffic summary")?;
        println!("{text}");
    } else {
        print!("{}", render_summary(summary));
    }
    Ok(())
}
