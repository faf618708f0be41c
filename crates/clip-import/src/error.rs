//! Import error taxonomy
//!
//! Transcoding problems have no variant here: the processor recovers from
//! them per record and reports a [`crate::transcode::ProcessOutcome`] instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

#[derive(Error, Debug)]
pub enum ImportError {
    /// A source file could not be fetched; the run stops before any import step
    #[error("Failed to acquire {file}: {message}")]
    Acquisition { file: String, message: String },

    /// Malformed line in a source file; fatal to the step
    #[error("Failed to read {}: line {line}: {source}", path.display())]
    Read {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },

    /// Line does not have one value per declared field
    #[error("Failed to read {}: line {line}: expected {expected} fields, found {found}", path.display())]
    FieldCount {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Source file could not be opened
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A write statement failed for one record; fatal to the chunk and step
    #[error("Failed to persist {record}: {source}")]
    Persistence {
        record: String,
        #[source]
        source: sqlx::Error,
    },

    /// Positional parameters were not assigned as `1..=n`
    #[error("Invalid statement parameters: {0}")]
    Statement(String),

    /// Transaction or connection level failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error(transparent)]
    Common(#[from] clip_common::ClipError),
}

impl ImportError {
    /// Which part of the pipeline this failure belongs to, for the run report
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::Acquisition { .. } => "acquisition",
            ImportError::Read { .. } | ImportError::FieldCount { .. } | ImportError::Open { .. } => {
                "read"
            },
            ImportError::Persistence { .. } | ImportError::Statement(_) => "persistence",
            ImportError::Database(_) | ImportError::Migration(_) => "database",
            ImportError::Config(_) | ImportError::Common(_) => "config",
            ImportError::Io(_) => "io",
            ImportError::Notification(_) => "notification",
        }
    }
}
