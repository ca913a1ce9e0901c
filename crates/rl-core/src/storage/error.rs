//! Store error handling
//!
//! Provides typed errors for store operations with descriptive messages
//! and recovery suggestions. Every variant maps onto one of four kinds
//! (see [`ErrorKind`]) so callers can branch without matching variants.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// No link matches the id
    #[error("Link not found: {id}")]
    NotFound { id: String },

    /// URL is not absolute or lacks a scheme or host
    #[error("Invalid URL '{url}': expected an absolute URL such as https://example.com")]
    InvalidUrl { url: String },

    /// Id does not have the short id format
    #[error("Invalid ID format: '{id}'")]
    InvalidId { id: String },

    /// Import payload could not be decoded
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Search query rejected before reaching the index
    #[error("Invalid search query: {reason}")]
    InvalidQuery { reason: String },

    /// Failed to create the directory holding the database
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

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A schema migration failed; nothing of that version was recorded
    #[error("Migration {version} ({name}) failed: {source}")]
    Migration {
        version: i64,
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Two migration steps claim the same version
    #[error("Migrations '{first}' and '{second}' share version {version}")]
    DuplicateMigration {
        version: i64,
        first: String,
        second: String,
    },

    /// Import hit a storage failure; earlier records remain committed
    #[error("Import stopped at '{url}' after {completed} record(s): {source}")]
    ImportAborted {
        url: String,
        completed: usize,
        #[source]
        source: Box<StoreError>,
    },

    /// The full-text index rejected or failed the query
    #[error("Search failed for '{query}': {source}")]
    Search {
        query: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Export could not be encoded
    #[error("Failed to encode JSON: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Coarse classification of [`StoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The targeted link does not exist
    NotFound,
    /// Malformed URL, id, JSON or query
    InvalidInput,
    /// Engine, filesystem or migration failure
    StorageFailure,
    /// Search path only
    IndexFailure,
}

impl StoreError {
    /// Create an error from an I/O error raised while preparing `path`
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path,
                source: error,
            },
            _ => StoreError::CreateDirectory {
                path,
                source: error,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::InvalidUrl { .. }
            | StoreError::InvalidId { .. }
            | StoreError::InvalidJson(_)
            | StoreError::InvalidQuery { .. } => ErrorKind::InvalidInput,
            StoreError::Search { .. } => ErrorKind::IndexFailure,
            StoreError::ImportAborted { source, .. } => source.kind(),
            StoreError::CreateDirectory { .. }
            | StoreError::PermissionDenied { .. }
            | StoreError::Database(_)
            | StoreError::Migration { .. }
            | StoreError::DuplicateMigration { .. }
            | StoreError::Serialize(_) => ErrorKind::StorageFailure,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::InvalidId { .. } => {
                Some("IDs are 10-30 letters and digits. Run `rl ls --all` to see them.")
            }
            StoreError::InvalidUrl { .. } => {
                Some("Include the scheme, for example https://example.com.")
            }
            StoreError::Search { .. } => {
                Some("Quote phrases and avoid stray punctuation, for example: rl grep '\"rust book\"'.")
            }
            StoreError::PermissionDenied { .. } => {
                Some("Check file and directory permissions, or point --db-path somewhere writable.")
            }
            StoreError::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                Some("Another rl process is using the database. Try again in a moment.")
            }
            StoreError::Migration { .. } | StoreError::DuplicateMigration { .. } => {
                Some("The database was left at its previous schema version. Back it up before retrying.")
            }
            _ => None,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
