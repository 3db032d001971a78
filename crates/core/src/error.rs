//! Error types and recovery hints for the local cache
//!
//! Every cache failure maps to a severity tier and a recovery action:
//! - **Recoverable**: a busy or failing statement, retry later
//! - **Degraded**: an internal fault, the current operation is abandoned
//! - **Fatal**: the cache file is damaged or cannot be upgraded

use std::fmt;
use thiserror::Error;

/// What the caller should do about a failed cache operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Retry with exponential backoff
    RetryWithBackoff,
    /// Drop the cache and download books again
    RebuildCache,
    /// No automatic recovery - user intervention required
    UserIntervention,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetryWithBackoff => write!(f, "Retrying with backoff"),
            Self::RebuildCache => write!(f, "Rebuilding cache"),
            Self::UserIntervention => write!(f, "User intervention required"),
        }
    }
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Recoverable,
    Degraded,
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Main error type for Shelfcast
#[derive(Error, Debug)]
pub enum AppError {
    /// A statement or transaction against the cache failed
    #[error("Database error: {message}")]
    DatabaseError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// `PRAGMA integrity_check` reported damage
    #[error("Database corrupted: {details}")]
    DatabaseCorrupted { details: String },

    /// A schema migration could not be applied
    #[error("Migration failed: {version} - {reason}")]
    MigrationFailed { version: String, reason: String },

    /// Poisoned lock or other broken in-process state
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DatabaseError { .. } => ErrorSeverity::Recoverable,
            Self::InternalError { .. } => ErrorSeverity::Degraded,
            Self::DatabaseCorrupted { .. } | Self::MigrationFailed { .. } => ErrorSeverity::Fatal,
        }
    }

    /// Returns the recommended recovery action for this error
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::DatabaseError { .. } => RecoveryAction::RetryWithBackoff,
            Self::DatabaseCorrupted { .. } => RecoveryAction::RebuildCache,
            Self::MigrationFailed { .. } | Self::InternalError { .. } => {
                RecoveryAction::UserIntervention
            }
        }
    }

    /// Returns a user-friendly error message suitable for display in the UI
    pub fn user_message(&self) -> String {
        match self {
            Self::DatabaseError { .. } => {
                "Local storage is temporarily unavailable. Please try again.".to_string()
            }
            Self::DatabaseCorrupted { .. } => {
                "Downloaded books are damaged and will be downloaded again.".to_string()
            }
            Self::MigrationFailed { .. } => "Failed to update local storage.".to_string(),
            Self::InternalError { .. } => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }

    /// Returns true if this error can be automatically retried
    pub fn is_retryable(&self) -> bool {
        self.recovery_action() == RecoveryAction::RetryWithBackoff
    }

    /// Helper to create a database error from any error type
    pub fn database<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::DatabaseError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Recoverable < ErrorSeverity::Degraded);
        assert!(ErrorSeverity::Degraded < ErrorSeverity::Fatal);
    }

    #[test]
    fn test_database_error_is_retryable() {
        let err = AppError::database("Failed to store book", io::Error::other("busy"));
        assert_eq!(err.severity(), ErrorSeverity::Recoverable);
        assert_eq!(err.recovery_action(), RecoveryAction::RetryWithBackoff);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_database_helper_keeps_source() {
        let err = AppError::database("Failed to write chapters", io::Error::other("disk"));
        assert!(err.to_string().contains("Failed to write chapters"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_corruption_rebuilds_cache() {
        let err = AppError::DatabaseCorrupted {
            details: "page checksum".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Fatal);
        assert_eq!(err.recovery_action(), RecoveryAction::RebuildCache);
        assert_eq!(err.recovery_action().to_string(), "Rebuilding cache");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_migration_failure_needs_user() {
        let err = AppError::MigrationFailed {
            version: "2".to_string(),
            reason: "no such table".to_string(),
        };
        assert_eq!(err.to_string(), "Migration failed: 2 - no such table");
        assert_eq!(err.recovery_action(), RecoveryAction::UserIntervention);
    }

    #[test]
    fn test_internal_error_message() {
        let err = AppError::InternalError {
            message: "lock poisoned".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Degraded);
        assert!(!err.user_message().is_empty());
    }
}
