use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::{Listing, StoredListing};
use crate::report::SourceReport;

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Turns one agency's listing page into drafts.
///
/// One implementation per site. Extraction is a pure function of the page
/// body; fetching is the [`Fetcher`]'s job.
pub trait SiteExtractor: Send + Sync {
    /// Human-readable site name stored in `Listing::site`.
    fn site(&self) -> &str;

    /// The listing index page to fetch.
    fn index_url(&self) -> &str;

    /// Parse the page. Individual bad cards are reported, never fatal.
    fn extract(&self, html: &str) -> SourceReport;
}

/// Durable listing storage.
pub trait ListingStore: Send + Sync + Clone {
    /// Held for the duration of a run; dropping it releases the run lock.
    type RunGuard: Send;

    /// Take the run-level lock, failing with [`AppError::RunInProgress`]
    /// if another run holds it.
    fn lock_run(&self) -> impl Future<Output = Result<Self::RunGuard, AppError>> + Send;

    /// Create the listings table and dedup-key index if absent. Idempotent.
    fn ensure_schema(&self) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Every non-null `image_url` currently stored.
    fn known_image_urls(&self) -> impl Future<Output = Result<HashSet<String>, AppError>> + Send;

    /// Batch-insert listings. Returns the number of rows written.
    fn insert_listings(
        &self,
        listings: &[Listing],
    ) -> impl Future<Output = Result<u64, AppError>> + Send;

    /// All stored listings, newest `scraped_date` first, then newest id.
    fn list_listings(&self) -> impl Future<Output = Result<Vec<StoredListing>, AppError>> + Send;
}

/// Side-channel consumer of the full, undeduplicated batch of a run.
pub trait BackupSink: Send + Sync {
    /// Write the batch. Returns where it went, or `None` if nothing was written.
    fn write_backup(
        &self,
        run_date: NaiveDate,
        listings: &[Listing],
    ) -> Result<Option<PathBuf>, AppError>;
}

/// A backup sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackup;

impl BackupSink for NoBackup {
    fn write_backup(
        &self,
        _run_date: NaiveDate,
        _listings: &[Listing],
    ) -> Result<Option<PathBuf>, AppError> {
        Ok(None)
    }
}
