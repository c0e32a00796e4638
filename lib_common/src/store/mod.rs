//! # CSV Store
//!
//! The store is a single CSV file: a header row followed by every data row
//! merged since the last reset. It has one writer (the polling loop) and any
//! number of readers (the web facade).
//!
//! ## Contained Modules:
//! - **`csv_rows`**: minimal CSV record parsing and writing.
//! - **`merger`**: creates the store or appends a snapshot's data rows.
//! - **`resetter`**: truncates the store inside the daily reset window.
//! - **`reader`**: read-only views of the store for display and download.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// CSV record parsing and serialization.
pub mod csv_rows;
/// Snapshot merge into the store.
pub mod merger;
/// Read-only access to the store.
pub mod reader;
/// Daily store truncation.
pub mod resetter;

pub use merger::{merge, MergeOptions, MergeOutcome};
pub use reader::{StoreReader, StoreView};
pub use resetter::{maybe_reset, ResetWindow};

/// Field separator of the upstream feed and of the store.
pub const DELIMITER: char = ',';
