//! Error types for the reconciliation core.
//!

use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    /// The singleton core settings record is absent. Fatal for the cycle that needed it.
    #[error("Core settings record not found")]
    MissingCoreSettings,
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Job dispatch error for {job}: {reason}")]
    JobDispatch { job: String, reason: String },
    #[error("Invalid time zone '{0}'")]
    InvalidTimeZone(String),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl From<sqlx::Error> for ReconcileError {
    fn from(err: sqlx::Error) -> Self {
        ReconcileError::DatabaseError(err.to_string())
    }
}

impl From<ConfigurationError> for ReconcileError {
    fn from(err: ConfigurationError) -> Self {
        ReconcileError::ConfigurationError(err.to_string())
    }
}

pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;
