//! # Ingestion Errors
//!
//! Every failure a cycle can hit, grouped into the three classes the loop
//! reports on. None of them is fatal to the loop.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::csv_rows::ParseError;

/// Coarse class of a cycle failure, used for logging and cycle reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Non-success status, network error or timeout.
    Fetch,
    /// Malformed snapshot or store write error.
    Merge,
    /// Store truncation error.
    Reset,
}

/// Errors produced by the fetcher, the merger and the resetter.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The upstream answered with a non-success status.
    #[error("Failed to fetch data. Status code: {status}")]
    FetchStatus {
        /// HTTP status returned by the origin.
        status: u16,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("Failed to fetch data: {0}")]
    Fetch(String),

    /// The snapshot is not UTF-8 text.
    #[error("Snapshot is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The snapshot has no header row.
    #[error("Snapshot is empty")]
    EmptySnapshot,

    /// The snapshot text is not well-formed delimited data.
    #[error("Malformed CSV at line {line}: {reason}")]
    MalformedSnapshot {
        /// 1-based line of the offending record.
        line: usize,
        /// What the parser rejected.
        reason: String,
    },

    /// Reading or writing the store failed.
    #[error("Store I/O failed on {path}: {source}")]
    StoreIo {
        /// Store path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// Truncating the store failed.
    #[error("Failed to reset {path}: {source}")]
    Reset {
        /// Store path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// A blocking store task panicked or was cancelled.
    #[error("Store task aborted: {0}")]
    Task(String),
}

impl IngestError {
    /// Which part of the cycle produced this error.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::FetchStatus { .. } | Self::Fetch(_) => FailureClass::Fetch,
            Self::Reset { .. } => FailureClass::Reset,
            Self::InvalidUtf8(_)
            | Self::EmptySnapshot
            | Self::MalformedSnapshot { .. }
            | Self::StoreIo { .. }
            | Self::Task(_) => FailureClass::Merge,
        }
    }
}

impl From<ParseError> for IngestError {
    fn from(e: ParseError) -> Self {
        Self::MalformedSnapshot {
            line: e.line,
            reason: e.reason,
        }
    }
}
