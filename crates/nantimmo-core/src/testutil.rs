//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::{Listing, ListingDraft, StoredListing};
use crate::pipeline::{PipelineEvent, PipelineReporter, RunState};
use crate::report::{SkipReason, SourceReport};
use crate::traits::{BackupSink, Fetcher, ListingStore, SiteExtractor};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable response.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns an empty page.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(String::new())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// StubExtractor
// ---------------------------------------------------------------------------

/// Build a page understood by [`StubExtractor`]: one card per line,
/// the line being the card's image URL, `!` for a broken card.
pub fn stub_page(images: &[&str]) -> String {
    images.join("\n")
}

/// Extractor over the line-based format produced by [`stub_page`].
pub struct StubExtractor {
    site: String,
    url: String,
}

impl StubExtractor {
    pub fn new(site: &str, url: &str) -> Self {
        Self {
            site: site.to_string(),
            url: url.to_string(),
        }
    }
}

impl SiteExtractor for StubExtractor {
    fn site(&self) -> &str {
        &self.site
    }

    fn index_url(&self) -> &str {
        &self.url
    }

    fn extract(&self, html: &str) -> SourceReport {
        let cards = html.lines().filter(|l| !l.trim().is_empty()).map(|line| {
            if line.trim() == "!" {
                return Err(SkipReason::Malformed("broken card".into()));
            }
            Ok(ListingDraft {
                title_parts: vec![Some(format!("Listing {line}"))],
                title_separator: ", ",
                price_text: Some("250 000 €".into()),
                image_url: Some(line.trim().to_string()),
                surface_text: Some("50 m²".into()),
                ..ListingDraft::default()
            })
        });
        SourceReport::from_cards(&self.site, cards)
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// Releases the mock run lock on drop.
pub struct MockRunGuard {
    locked: Arc<AtomicBool>,
}

impl Drop for MockRunGuard {
    fn drop(&mut self) {
        self.locked.store(false, Ordering::SeqCst);
    }
}

/// In-memory store recording every call.
#[derive(Clone)]
pub struct MockStore {
    known: Arc<Mutex<HashSet<String>>>,
    rows: Arc<Mutex<Vec<Listing>>>,
    keys_error: Arc<Mutex<Option<AppError>>>,
    insert_error: Arc<Mutex<Option<AppError>>>,
    insert_calls: Arc<Mutex<usize>>,
    schema_calls: Arc<Mutex<usize>>,
    locked: Arc<AtomicBool>,
}

impl MockStore {
    /// Empty store, nothing known yet.
    pub fn empty() -> Self {
        Self {
            known: Arc::new(Mutex::new(HashSet::new())),
            rows: Arc::new(Mutex::new(Vec::new())),
            keys_error: Arc::new(Mutex::new(None)),
            insert_error: Arc::new(Mutex::new(None)),
            insert_calls: Arc::new(Mutex::new(0)),
            schema_calls: Arc::new(Mutex::new(0)),
            locked: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Store that already holds listings with these image URLs.
    pub fn with_known(images: &[&str]) -> Self {
        let store = Self::empty();
        store
            .known
            .lock()
            .unwrap()
            .extend(images.iter().map(|i| i.to_string()));
        store
    }

    /// Store whose key query fails once.
    pub fn with_keys_error(error: AppError) -> Self {
        let store = Self::empty();
        *store.keys_error.lock().unwrap() = Some(error);
        store
    }

    /// Store whose insert fails once.
    pub fn with_insert_error(error: AppError) -> Self {
        let store = Self::empty();
        *store.insert_error.lock().unwrap() = Some(error);
        store
    }

    /// Listings written so far, in insertion order.
    pub fn inserted(&self) -> Vec<Listing> {
        self.rows.lock().unwrap().clone()
    }

    pub fn insert_calls(&self) -> usize {
        *self.insert_calls.lock().unwrap()
    }

    pub fn schema_calls(&self) -> usize {
        *self.schema_calls.lock().unwrap()
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }
}

impl ListingStore for MockStore {
    type RunGuard = MockRunGuard;

    async fn lock_run(&self) -> Result<MockRunGuard, AppError> {
        if self.locked.swap(true, Ordering::SeqCst) {
            return Err(AppError::RunInProgress);
        }
        Ok(MockRunGuard {
            locked: Arc::clone(&self.locked),
        })
    }

    async fn ensure_schema(&self) -> Result<(), AppError> {
        *self.schema_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn known_image_urls(&self) -> Result<HashSet<String>, AppError> {
        if let Some(e) = self.keys_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.known.lock().unwrap().clone())
    }

    async fn insert_listings(&self, listings: &[Listing]) -> Result<u64, AppError> {
        *self.insert_calls.lock().unwrap() += 1;
        if let Some(e) = self.insert_error.lock().unwrap().take() {
            return Err(e);
        }
        let mut known = self.known.lock().unwrap();
        known.extend(listings.iter().filter_map(|l| l.image_url.clone()));
        self.rows.lock().unwrap().extend_from_slice(listings);
        Ok(listings.len() as u64)
    }

    async fn list_listings(&self) -> Result<Vec<StoredListing>, AppError> {
        let mut stored: Vec<StoredListing> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, listing)| StoredListing {
                id: i as i64 + 1,
                listing: listing.clone(),
                created_at: None,
            })
            .collect();
        stored.sort_by(|a, b| {
            b.listing
                .scraped_date
                .cmp(&a.listing.scraped_date)
                .then(b.id.cmp(&a.id))
        });
        Ok(stored)
    }
}

// ---------------------------------------------------------------------------
// MockBackup
// ---------------------------------------------------------------------------

/// Backup sink that keeps the last batch in memory.
#[derive(Clone, Default)]
pub struct MockBackup {
    written: Arc<Mutex<Vec<Listing>>>,
    error: Arc<Mutex<Option<String>>>,
}

impl MockBackup {
    pub fn failing(message: &str) -> Self {
        Self {
            written: Arc::new(Mutex::new(Vec::new())),
            error: Arc::new(Mutex::new(Some(message.to_string()))),
        }
    }

    pub fn written(&self) -> Vec<Listing> {
        self.written.lock().unwrap().clone()
    }
}

impl BackupSink for MockBackup {
    fn write_backup(
        &self,
        run_date: NaiveDate,
        listings: &[Listing],
    ) -> Result<Option<PathBuf>, AppError> {
        if let Some(message) = self.error.lock().unwrap().take() {
            return Err(AppError::BackupError(message));
        }
        *self.written.lock().unwrap() = listings.to_vec();
        Ok(Some(PathBuf::from(format!("listings_{run_date}.csv"))))
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that remembers state transitions and skipped cards.
#[derive(Default)]
pub struct RecordingReporter {
    states: Mutex<Vec<RunState>>,
    skipped_cards: Mutex<usize>,
}

impl RecordingReporter {
    pub fn states(&self) -> Vec<RunState> {
        self.states.lock().unwrap().clone()
    }

    pub fn skipped_cards(&self) -> usize {
        *self.skipped_cards.lock().unwrap()
    }
}

impl PipelineReporter for RecordingReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::StateChanged { to, .. } => self.states.lock().unwrap().push(to),
            PipelineEvent::CardSkipped { .. } => *self.skipped_cards.lock().unwrap() += 1,
            _ => {}
        }
    }
}
