//! Typed error hierarchy for the checker builder.
//!
//! Two top-level enums cover the two halves of the library:
//! - `BuilderError` - document and reducer failures (pure, no I/O)
//! - `SyncError` - save/load/publish failures against the persistence endpoint

use thiserror::Error;

use crate::builder::models::Sequence;

/// Errors from the document model and the reducer.
#[derive(Debug, Error, PartialEq)]
pub enum BuilderError {
    #[error("Index {index} is out of range for {sequence} (length {len})")]
    InvalidIndex {
        sequence: Sequence,
        index: usize,
        len: usize,
    },

    #[error("Unknown sequence or setting '{0}'")]
    UnknownSequenceOrField(String),

    #[error("Invalid checker id '{0}': use lowercase letters, digits and hyphens")]
    InvalidId(String),

    #[error("Invalid checker document: {0}")]
    InvalidDocument(String),
}

/// Errors from talking to the persistence endpoint.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Network failure: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Checker '{id}' not found")]
    NotFound { id: String },

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("A save for checker '{id}' is already in progress")]
    SaveInProgress { id: String },

    #[error(transparent)]
    InvalidDocument(#[from] BuilderError),
}

impl SyncError {
    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Network(e) => e.is_timeout() || e.is_connect(),
            SyncError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
