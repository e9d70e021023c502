use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use clap::Args;
use nantimmo_client::{HttpConfig, ReqwestFetcher, default_sources};
use nantimmo_core::{
    AppError, BackupStatus, CsvBackup, Pipeline, PipelineConfig, RunSummary,
    TracingPipelineReporter,
};
use nantimmo_db::ListingRepository;

/// Knobs for a pipeline run, shared by `run` and `schedule`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Directory receiving the daily CSV backup of every scraped listing
    #[arg(long, env = "NANTIMMO_BACKUP_DIR", default_value = "data/scrapers")]
    pub backup_dir: PathBuf,

    /// Do not write the CSV backup
    #[arg(long, default_value_t = false)]
    pub no_backup: bool,

    /// Pause between two agencies, in seconds
    #[arg(long, env = "NANTIMMO_SOURCE_DELAY_SECS", default_value_t = 2)]
    pub source_delay_secs: u64,

    /// Connect/read timeout for each page, in seconds
    #[arg(long, env = "NANTIMMO_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Override the browser User-Agent sent to agency sites
    #[arg(long, env = "NANTIMMO_USER_AGENT")]
    pub user_agent: Option<String>,
}

impl RunArgs {
    fn http_config(&self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            accept_language: defaults.accept_language,
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            source_delay: Duration::from_secs(self.source_delay_secs),
        }
    }
}

/// A fully wired pipeline; all configuration is bound at construction.
pub struct Runner {
    pipeline: Pipeline<ReqwestFetcher, ListingRepository, CsvBackup>,
}

impl Runner {
    pub fn new(args: &RunArgs, repo: ListingRepository) -> Result<Self, AppError> {
        let fetcher = ReqwestFetcher::new(&args.http_config())?;
        let sources = default_sources()?;
        let config = args.pipeline_config();

        let pipeline = if args.no_backup {
            Pipeline::new(fetcher, repo, sources, config)
        } else {
            let backup = CsvBackup::new(&args.backup_dir);
            Pipeline::with_backup(fetcher, repo, backup, sources, config)
        };

        Ok(Self { pipeline })
    }

    /// Scheduler entry point: one complete run dated today (process-local).
    pub async fn run_full_process(&self) -> Result<RunSummary, AppError> {
        let today = Local::now().date_naive();
        self.pipeline.run(today, &TracingPipelineReporter).await
    }
}

/// Print a run summary on stdout.
pub fn print_summary(summary: &RunSummary) {
    println!("Run of {}:", summary.scraped_date);
    for source in &summary.sources {
        println!(
            "  {:<20} {} cards, {} listings, {} skipped",
            source.site, source.cards_found, source.listings, source.cards_skipped
        );
    }
    for failure in &summary.source_failures {
        println!("  {:<20} FAILED: {}", failure.site, failure.error);
    }

    println!("  scraped:    {}", summary.total_scraped);
    println!("  duplicates: {}", summary.duplicates_skipped);
    println!("  new saved:  {}", summary.new_persisted);

    match &summary.backup {
        BackupStatus::Written(path) => println!("  backup:     {}", path.display()),
        BackupStatus::Failed(error) => println!("  backup:     FAILED: {error}"),
        BackupStatus::Skipped => println!("  backup:     nothing to write"),
        BackupStatus::Disabled => {}
    }

    if summary.recovered_errors() > 0 {
        println!("  recovered errors: {}", summary.recovered_errors());
    }
}
