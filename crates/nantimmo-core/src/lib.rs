pub mod backup;
pub mod dedup;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use backup::CsvBackup;
pub use dedup::{DedupOutcome, filter_duplicates};
pub use error::AppError;
pub use models::{Listing, ListingDraft, StoredListing};
pub use pipeline::{
    BackupStatus, Pipeline, PipelineConfig, PipelineEvent, PipelineReporter, RunState,
    RunSummary, TracingPipelineReporter,
};
pub use report::{CardOutcome, SkipReason, SkippedCard, SourceReport};
pub use traits::{BackupSink, Fetcher, ListingStore, NoBackup, SiteExtractor};
