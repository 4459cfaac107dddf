//! Error handling
//!
//! Typed errors for configuration, lookups and the backing store.
//! Backing-store failures are wrapped, never reclassified.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::TextId;

/// Errors that can occur while configuring or using the text storage
#[derive(Error, Debug)]
pub enum TextStorageError {
    /// Configuration was rejected at construction time
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A write referenced a text that does not exist
    #[error("Text `{0}` not found")]
    NotFound(TextId),

    /// The revision log already holds this revision
    #[error("Revision {revision} of text `{text_id}` is already archived")]
    DuplicateRevision { text_id: TextId, revision: u32 },

    /// The revision counter of a text cannot grow any further
    #[error("Text `{0}` has reached the maximum revision number")]
    RevisionOverflow(TextId),

    /// Every commit attempt lost to another writer
    #[error("Text `{text_id}` kept changing concurrently; gave up after {attempts} attempts")]
    Contention { text_id: TextId, attempts: u32 },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to read a configuration file
    #[error("Failed to read config file '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to create the directory holding the database
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TextStorageError {
    /// Build a configuration error from any displayable message
    pub fn configuration(message: impl std::fmt::Display) -> Self {
        TextStorageError::Configuration(message.to_string())
    }

    /// Check if this error reports a missing text
    pub fn is_not_found(&self) -> bool {
        matches!(self, TextStorageError::NotFound(_))
    }

    /// Check if this error was raised while validating configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, TextStorageError::Configuration(_))
    }
}

/// Result type for text storage operations
pub type TextStorageResult<T> = Result<T, TextStorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = TextStorageError::NotFound(TextId::new(42));

        assert!(err.is_not_found());
        assert!(!err.is_configuration());
        assert_eq!(err.to_string(), "Text `42` not found");
    }

    #[test]
    fn test_configuration_display() {
        let err = TextStorageError::configuration("unknown field `foo`");

        assert!(err.is_configuration());
        assert!(err.to_string().contains("foo"));
    }

    #[test]
    fn test_write_failure_display() {
        let err = TextStorageError::RevisionOverflow(TextId::new(3));
        assert!(err.to_string().contains("`3`"));

        let err = TextStorageError::Contention {
            text_id: TextId::new(3),
            attempts: 1000,
        };
        assert!(err.to_string().contains("1000 attempts"));
    }

    #[test]
    fn test_database_error_converts() {
        let err: TextStorageError = rusqlite::Error::QueryReturnedNoRows.into();

        assert!(matches!(err, TextStorageError::Database(_)));
        assert!(err.to_string().starts_with("Database error"));
    }

    #[test]
    fn test_read_config_display() {
        let err = TextStorageError::ReadConfig {
            path: PathBuf::from("/etc/textstore/config.toml"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };

        let msg = err.to_string();
        assert!(msg.contains("/etc/textstore/config.toml"));
        assert!(msg.contains("denied"));
    }
}
