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
    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing an entry
    #[error("Permission denied: cannot access '{location}'. Check file permissions.")]
    PermissionDenied {
        location: String,
        #[source]
        source: io::Error,
    },

    /// Disk is full
    #[error(
        "Disk full while writing to '{location}'. Free up disk space and try again."
    )]
    DiskFull {
        location: String,
        #[source]
        source: io::Error,
    },

    /// The medium refused the write because it is over its size budget
    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, limit is {limit}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    /// Failed to read an entry
    #[error("Failed to read '{location}': {source}")]
    ReadError {
        location: String,
        #[source]
        source: io::Error,
    },

    /// Failed to write an entry
    #[error("Failed to write '{location}': {source}")]
    WriteError {
        location: String,
        #[source]
        source: io::Error,
    },

    /// Value could not be encoded as JSON
    #[error("Failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Entry not found (when expected to exist)
    #[error("Not found: '{location}'")]
    NotFound { location: String },

    /// Atomic write failed during rename
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A thread panicked while holding the medium lock
    #[error("Storage medium lock poisoned")]
    Poisoned,
}

impl StorageError {
    /// Create an error from an I/O error with location context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, location: impl Into<String>) -> Self {
        let location = location.into();
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                location,
                source: error,
            },
            io::ErrorKind::NotFound => StorageError::NotFound { location },
            _ if is_disk_full_error(&error) => StorageError::DiskFull {
                location,
                source: error,
            },
            _ => StorageError::WriteError {
                location,
                source: error,
            },
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::DiskFull { .. }
                | StorageError::QuotaExceeded { .. }
                | StorageError::PermissionDenied { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::QuotaExceeded { .. } => {
                Some("Remove some books or clear the search history, then try again.")
            }
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to change ownership of the data directory.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
