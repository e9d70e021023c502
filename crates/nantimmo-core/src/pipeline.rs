use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use crate::dedup::filter_duplicates;
use crate::error::AppError;
use crate::models::Listing;
use crate::report::{SkippedCard, SourceReport};
use crate::traits::{BackupSink, Fetcher, ListingStore, SiteExtractor};

/// Phases of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Scraping,
    Deduping,
    Persisting,
    Done,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Scraping => "scraping",
            RunState::Deduping => "deduping",
            RunState::Persisting => "persisting",
            RunState::Done => "done",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the pipeline for monitoring/logging.
#[derive(Debug, Clone)]
pub enum PipelineEvent<'a> {
    StateChanged {
        from: RunState,
        to: RunState,
    },
    SourceStarted {
        site: &'a str,
        url: &'a str,
    },
    CardSkipped {
        site: &'a str,
        card: &'a SkippedCard,
    },
    SourceScraped {
        site: &'a str,
        cards_found: usize,
        listings: usize,
        skipped: usize,
    },
    SourceFailed {
        site: &'a str,
        error: &'a str,
    },
    BackupWritten {
        path: &'a std::path::Path,
        listings: usize,
    },
    BackupFailed {
        error: &'a str,
    },
    DuplicatesFiltered {
        candidates: usize,
        duplicates: usize,
        new: usize,
    },
    Persisted {
        written: u64,
    },
    Finished {
        summary: &'a RunSummary,
    },
}

/// Trait for receiving pipeline events (decoupled logging).
pub trait PipelineReporter: Send + Sync {
    fn report(&self, event: PipelineEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPipelineReporter;

impl PipelineReporter for TracingPipelineReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::StateChanged { from, to } => {
                tracing::debug!(%from, %to, "Pipeline state changed");
            }
            PipelineEvent::SourceStarted { site, url } => {
                tracing::info!(%site, %url, "Scraping source");
            }
            PipelineEvent::CardSkipped { site, card } => {
                tracing::warn!(%site, index = card.index, reason = %card.reason, "Card skipped");
            }
            PipelineEvent::SourceScraped {
                site,
                cards_found,
                listings,
                skipped,
            } => {
                tracing::info!(%site, %cards_found, %listings, %skipped, "Source scraped");
            }
            PipelineEvent::SourceFailed { site, error } => {
                tracing::warn!(%site, %error, "Source failed");
            }
            PipelineEvent::BackupWritten { path, listings } => {
                tracing::info!(path = %path.display(), %listings, "Backup written");
            }
            PipelineEvent::BackupFailed { error } => {
                tracing::warn!(%error, "Backup failed");
            }
            PipelineEvent::DuplicatesFiltered {
                candidates,
                duplicates,
                new,
            } => {
                tracing::info!(%candidates, %duplicates, %new, "Duplicates filtered");
            }
            PipelineEvent::Persisted { written } => {
                tracing::info!(%written, "New listings saved");
            }
            PipelineEvent::Finished { summary } => {
                tracing::info!(
                    scraped = summary.total_scraped,
                    duplicates = summary.duplicates_skipped,
                    persisted = summary.new_persisted,
                    failed_sources = summary.source_failures.len(),
                    "Run finished"
                );
            }
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Courtesy pause between two consecutive sources.
    pub source_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_delay: Duration::from_secs(2),
        }
    }
}

/// Per-source counts for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub site: String,
    pub cards_found: usize,
    pub listings: usize,
    pub cards_skipped: usize,
}

/// A source whose page could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub site: String,
    pub error: String,
}

/// What happened to the flat-file backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupStatus {
    Disabled,
    Skipped,
    Written(PathBuf),
    Failed(String),
}

/// Terminal summary of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub scraped_date: NaiveDate,
    pub sources: Vec<SourceSummary>,
    pub source_failures: Vec<SourceFailure>,
    pub total_scraped: usize,
    pub cards_found: usize,
    pub cards_skipped: usize,
    pub duplicates_skipped: usize,
    pub new_persisted: u64,
    pub backup: BackupStatus,
}

impl RunSummary {
    fn new(scraped_date: NaiveDate) -> Self {
        Self {
            scraped_date,
            sources: Vec::new(),
            source_failures: Vec::new(),
            total_scraped: 0,
            cards_found: 0,
            cards_skipped: 0,
            duplicates_skipped: 0,
            new_persisted: 0,
            backup: BackupStatus::Disabled,
        }
    }

    /// Errors that were recovered from during the run.
    pub fn recovered_errors(&self) -> usize {
        let backup = usize::from(matches!(self.backup, BackupStatus::Failed(_)));
        self.cards_skipped + self.source_failures.len() + backup
    }
}

/// Orchestrates one ingestion run: scrape → normalize → dedup → persist.
///
/// Generic over the fetcher, store and backup sink so tests can run it
/// without network or database.
pub struct Pipeline<F, S, B>
where
    F: Fetcher,
    S: ListingStore,
    B: BackupSink,
{
    fetcher: F,
    store: S,
    backup: Option<B>,
    sources: Vec<Box<dyn SiteExtractor>>,
    config: PipelineConfig,
}

impl<F, S, B> Pipeline<F, S, B>
where
    F: Fetcher,
    S: ListingStore,
    B: BackupSink,
{
    /// Create a pipeline without a backup sink.
    pub fn new(
        fetcher: F,
        store: S,
        sources: Vec<Box<dyn SiteExtractor>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            backup: None,
            sources,
            config,
        }
    }

    /// Create a pipeline that also hands every run's full batch to `backup`.
    pub fn with_backup(
        fetcher: F,
        store: S,
        backup: B,
        sources: Vec<Box<dyn SiteExtractor>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            backup: Some(backup),
            sources,
            config,
        }
    }

    /// Run the pipeline once.
    ///
    /// Source fetch failures and bad cards are recorded in the summary.
    /// Only store errors (and a held run lock) abort the run.
    pub async fn run<R: PipelineReporter>(
        &self,
        scraped_date: NaiveDate,
        reporter: &R,
    ) -> Result<RunSummary, AppError> {
        let _guard = self.store.lock_run().await?;
        self.store.ensure_schema().await?;

        let mut summary = RunSummary::new(scraped_date);
        let mut state = RunState::Idle;

        transition(&mut state, RunState::Scraping, reporter);
        let batch = self.scrape_all(scraped_date, &mut summary, reporter).await;
        summary.total_scraped = batch.len();

        summary.backup = self.write_backup(scraped_date, &batch, reporter);

        transition(&mut state, RunState::Deduping, reporter);
        let known_keys = self.store.known_image_urls().await?;
        let candidates = batch.len();
        let outcome = filter_duplicates(batch, &known_keys);
        summary.duplicates_skipped = outcome.duplicate_count;
        reporter.report(PipelineEvent::DuplicatesFiltered {
            candidates,
            duplicates: outcome.duplicate_count,
            new: outcome.new.len(),
        });

        transition(&mut state, RunState::Persisting, reporter);
        if !outcome.new.is_empty() {
            summary.new_persisted = self.store.insert_listings(&outcome.new).await?;
        }
        reporter.report(PipelineEvent::Persisted {
            written: summary.new_persisted,
        });

        transition(&mut state, RunState::Done, reporter);
        reporter.report(PipelineEvent::Finished { summary: &summary });

        Ok(summary)
    }

    async fn scrape_all<R: PipelineReporter>(
        &self,
        scraped_date: NaiveDate,
        summary: &mut RunSummary,
        reporter: &R,
    ) -> Vec<Listing> {
        let mut batch = Vec::new();

        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 && !self.config.source_delay.is_zero() {
                tokio::time::sleep(self.config.source_delay).await;
            }

            match self.scrape_source(source.as_ref(), reporter).await {
                Ok(report) => {
                    summary.cards_found += report.cards_found;
                    summary.cards_skipped += report.skipped.len();
                    summary.sources.push(SourceSummary {
                        site: report.site.clone(),
                        cards_found: report.cards_found,
                        listings: report.drafts.len(),
                        cards_skipped: report.skipped.len(),
                    });

                    batch.extend(
                        report
                            .drafts
                            .into_iter()
                            .map(|draft| Listing::normalize(&report.site, draft, scraped_date)),
                    );
                }
                Err(e) => {
                    let error = e.to_string();
                    reporter.report(PipelineEvent::SourceFailed {
                        site: source.site(),
                        error: &error,
                    });
                    summary.source_failures.push(SourceFailure {
                        site: source.site().to_string(),
                        error,
                    });
                }
            }
        }

        batch
    }

    async fn scrape_source<R: PipelineReporter>(
        &self,
        source: &dyn SiteExtractor,
        reporter: &R,
    ) -> Result<SourceReport, AppError> {
        reporter.report(PipelineEvent::SourceStarted {
            site: source.site(),
            url: source.index_url(),
        });

        let html = self.fetcher.fetch(source.index_url()).await?;
        let report = source.extract(&html);

        for card in &report.skipped {
            reporter.report(PipelineEvent::CardSkipped {
                site: source.site(),
                card,
            });
        }
        reporter.report(PipelineEvent::SourceScraped {
            site: source.site(),
            cards_found: report.cards_found,
            listings: report.drafts.len(),
            skipped: report.skipped.len(),
        });

        Ok(report)
    }

    fn write_backup<R: PipelineReporter>(
        &self,
        scraped_date: NaiveDate,
        batch: &[Listing],
        reporter: &R,
    ) -> BackupStatus {
        let Some(backup) = &self.backup else {
            return BackupStatus::Disabled;
        };

        match backup.write_backup(scraped_date, batch) {
            Ok(Some(path)) => {
                reporter.report(PipelineEvent::BackupWritten {
                    path: &path,
                    listings: batch.len(),
                });
                BackupStatus::Written(path)
            }
            Ok(None) => BackupStatus::Skipped,
            Err(e) => {
                let error = e.to_string();
                reporter.report(PipelineEvent::BackupFailed { error: &error });
                BackupStatus::Failed(error)
            }
        }
    }
}

fn transition<R: PipelineReporter>(state: &mut RunState, to: RunState, reporter: &R) {
    reporter.report(PipelineEvent::StateChanged { from: *state, to });
    *state = to;
}
