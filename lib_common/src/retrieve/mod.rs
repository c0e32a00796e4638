//! # Data Retrieval Module
//!
//! Generic HTTP plumbing for upstream calls, so that ingestors deal with
//! payloads and status codes rather than client construction.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: an `ApiClient` built on `reqwest` and `reqwest-middleware`
//!   with a per-request timeout and opt-in transient retries.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client with timeout and optional retry middleware.
pub mod ky_http;
