mod runner;
mod scheduler;

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use nantimmo_core::StoredListing;
use nantimmo_db::{Database, DatabaseConfig, ListingRepository};

use crate::runner::{RunArgs, Runner, print_summary};
use crate::scheduler::RetryPolicy;

#[derive(Parser)]
#[command(
    name = "nantimmo",
    version,
    about = "Daily ingestion of Nantes real-estate listings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once: scrape, back up, deduplicate, persist
    Run {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Run the pipeline every day at a fixed local time
    Schedule {
        #[command(flatten)]
        run: RunArgs,

        /// Time of day (HH:MM, process-local)
        #[arg(long, default_value = "03:00", value_parser = parse_time)]
        at: NaiveTime,

        /// Extra attempts when a run fails on a transient error
        #[arg(long, default_value_t = 2)]
        retries: u32,

        /// Pause before each retry, in seconds
        #[arg(long, default_value_t = 600)]
        retry_delay_secs: u64,
    },

    /// Show stored listings, newest first
    List {
        /// Only show listings from this agency
        #[arg(short, long)]
        site: Option<String>,

        /// Number of listings to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| format!("expected HH:MM, got '{raw}': {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nantimmo=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { run } => {
            let repo = connect_db().await?;
            let runner = Runner::new(&run, repo)?;
            let summary = runner
                .run_full_process()
                .await
                .map_err(|e| anyhow::anyhow!(e))
                .context("Pipeline run failed")?;
            print_summary(&summary);
        }
        Commands::Schedule {
            run,
            at,
            retries,
            retry_delay_secs,
        } => {
            let repo = connect_db().await?;
            let runner = Runner::new(&run, repo)?;
            let policy = RetryPolicy {
                retries,
                delay: Duration::from_secs(retry_delay_secs),
            };

            let cancel = CancellationToken::new();
            let shutdown = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Shutdown signal received");
                    shutdown.cancel();
                }
            });

            scheduler::run_daily(&runner, at, policy, cancel).await;
        }
        Commands::List { site, limit, json } => {
            let repo = connect_db().await?;
            cmd_list(&repo, site.as_deref(), limit, json).await?;
        }
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL.
async fn connect_db() -> Result<ListingRepository> {
    let config = DatabaseConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let db = Database::connect(&config)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to connect to database")?;
    Ok(db.listing_repo())
}

async fn cmd_list(
    repo: &ListingRepository,
    site: Option<&str>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let listings: Vec<StoredListing> = repo
        .list_listings()
        .await
        .map_err(|e| anyhow::anyhow!(e))?
        .into_iter()
        .filter(|stored| site.is_none_or(|s| stored.listing.site == s))
        .take(limit)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    if listings.is_empty() {
        println!("No listings stored");
        return Ok(());
    }

    for stored in &listings {
        let listing = &stored.listing;
        println!(
            "  [{}] {} | {} | {} | {}",
            listing.scraped_date,
            listing.site,
            listing.title.as_deref().unwrap_or("-"),
            listing.price_text.as_deref().unwrap_or("-"),
            listing.url.as_deref().unwrap_or("-"),
        );
    }

    println!("\nTotal: {} listings", listings.len());

    Ok(())
}
