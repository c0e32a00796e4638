//! # Data Ingestors Module
//!
//! The polling side of the relay. A source produces snapshots; the polling
//! ingestor drives fetch → merge → reset check → sleep for the lifetime of
//! the process.
//!
//! ## Contained Modules:
//! - **`csv_source`**: the `SnapshotSource` trait and its HTTP implementation.
//! - **`csv_polling`**: the self-scheduling loop that feeds the CSV store.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// The self-scheduling polling loop.
pub mod csv_polling;
/// Snapshot sources.
pub mod csv_source;

// --- Public API Re-exports ---
pub use csv_polling::{CsvPollingIngestor, CycleReport};
pub use csv_source::{HttpSnapshotSource, SnapshotSource};
