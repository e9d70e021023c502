use thiserror::Error;

/// Application-wide error types for Nant'Immo.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (non-2xx status, unreadable body, bad request).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A page or stored value could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Writing the flat-file backup failed.
    #[error("Backup error: {0}")]
    BackupError(String),

    /// Another run currently holds the run lock.
    #[error("Another pipeline run is already in progress")]
    RunInProgress,
}

impl AppError {
    /// Returns true if this error is transient and a later retry may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_)
            | AppError::Timeout(_)
            | AppError::DatabaseError(_)
            | AppError::RunInProgress => true,
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }
}
