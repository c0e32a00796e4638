//! # lib_common
//!
//! Shared building blocks for the CSV feed relay. Every top-level module sits
//! behind a cargo feature of the same name so that binaries only pull in the
//! dependencies they need.
//!
//! - **`configs`**: the `IngestConfig` struct shared by the loop and the web facade.
//! - **`loggers`**: fern based console + file logging.
//! - **`retrieve`**: the `reqwest` client wrapper used for upstream calls.
//! - **`store`**: the CSV store (merge, daily reset, read facade).
//! - **`ingestors`**: the self-scheduling polling loop.

#![forbid(unsafe_code)]

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "store")]
pub mod errors;
#[cfg(feature = "ingestors")]
pub mod ingestors;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "retrieve")]
pub mod retrieve;
#[cfg(feature = "store")]
pub mod store;

// Re-export the types most callers reach for.
#[cfg(feature = "configs")]
pub use configs::config_ingest::IngestConfig;
#[cfg(feature = "store")]
pub use errors::{FailureClass, IngestError};
