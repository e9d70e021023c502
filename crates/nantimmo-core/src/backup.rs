use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::Listing;
use crate::traits::BackupSink;

/// Writes each run's full batch to `<dir>/listings_<YYYY-MM-DD>.csv`.
///
/// A second run on the same day overwrites that day's file.
#[derive(Debug, Clone)]
pub struct CsvBackup {
    dir: PathBuf,
}

impl CsvBackup {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Backup file path for a given run date.
    pub fn path_for(&self, run_date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("listings_{}.csv", run_date.format("%Y-%m-%d")))
    }

    fn write_file(path: &Path, listings: &[Listing]) -> Result<(), AppError> {
        let mut writer =
            csv::Writer::from_path(path).map_err(|e| AppError::BackupError(e.to_string()))?;
        for listing in listings {
            writer
                .serialize(listing)
                .map_err(|e| AppError::BackupError(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::BackupError(format!("Failed to flush {}: {e}", path.display())))
    }
}

impl BackupSink for CsvBackup {
    fn write_backup(
        &self,
        run_date: NaiveDate,
        listings: &[Listing],
    ) -> Result<Option<PathBuf>, AppError> {
        if listings.is_empty() {
            return Ok(None);
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::BackupError(format!("Failed to create {}: {e}", self.dir.display()))
        })?;

        let path = self.path_for(run_date);
        Self::write_file(&path, listings)?;
        Ok(Some(path))
    }
}
