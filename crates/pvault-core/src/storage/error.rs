//! Storage error handling
//!
//! Provides typed errors for storage operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// The storage engine could not be opened or initialized
    #[error("Storage unavailable at '{path}': {details}")]
    Unavailable { path: PathBuf, details: String },

    /// A write did not fit in the remaining capacity
    #[error("Storage quota exceeded while saving '{id}'{}", quota_suffix(.quota_bytes))]
    QuotaExceeded { id: String, quota_bytes: Option<u64> },

    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stored row could not be decoded into a record
    #[error("Stored record '{id}' is invalid: {details}")]
    InvalidRecord { id: String, details: String },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The blocking storage task panicked or was cancelled
    #[error("Storage task failed: {0}")]
    Task(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn quota_suffix(quota: &Option<u64>) -> String {
    match quota {
        Some(bytes) => format!(" (quota {} bytes)", bytes),
        None => String::new(),
    }
}

impl StorageError {
    /// Create an error from an I/O error hit while preparing the data directory
    ///
    /// Classifies the error based on its kind.
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ => StorageError::CreateDirectory {
                path,
                source: error,
            },
        }
    }

    /// Whether the engine itself could not be reached
    ///
    /// Readers treat this as an empty collection and keep going.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable { .. }
                | StorageError::CreateDirectory { .. }
                | StorageError::PermissionDenied { .. }
        )
    }

    /// Whether a write failed because capacity is exhausted
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::QuotaExceeded { .. } => {
                Some("Delete unused prompts, store media as links instead of embedded files, or raise storage_quota_bytes.")
            }
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to run with different permissions or change ownership.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::Unavailable { .. } => {
                Some("Check that data_dir points to a writable location and that no other process holds the database.")
            }
            _ => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StorageError::from_io(io_err, PathBuf::from("/test/path"));

        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(err.is_unavailable());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_other_io_is_create_directory() {
        let io_err = io::Error::new(io::ErrorKind::Other, "read-only file system");
        let err = StorageError::from_io(io_err, PathBuf::from("/ro/pvault"));

        assert!(matches!(err, StorageError::CreateDirectory { .. }));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_quota_exceeded() {
        let err = StorageError::QuotaExceeded {
            id: "1700000000000".to_string(),
            quota_bytes: Some(65536),
        };

        assert!(err.is_quota_exceeded());
        assert!(!err.is_unavailable());
        let msg = err.to_string();
        assert!(msg.contains("quota exceeded"));
        assert!(msg.contains("65536"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_quota_exceeded_without_known_quota() {
        let err = StorageError::QuotaExceeded {
            id: "42".to_string(),
            quota_bytes: None,
        };
        assert_eq!(err.to_string(), "Storage quota exceeded while saving '42'");
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::Unavailable {
            path: PathBuf::from("/data/pvault.db"),
            details: "unable to open database file".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("unavailable"));
        assert!(msg.contains("/data/pvault.db"));
    }
}
