//! # Configuration Modules
//!
//! Holds the configuration shared by the ingestion loop and the data access
//! facade. Binaries layer their own CLI/env handling on top of it.

/// Ingestion settings: endpoint, headers, store path, cadence and reset window.
pub mod config_ingest;
