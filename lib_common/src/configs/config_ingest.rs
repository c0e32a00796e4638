//! # Ingestion Configuration
//!
//! `IngestConfig` carries the upstream endpoint and headers, the store file
//! and the loop cadence. One instance is built at start-up and handed to both
//! the polling loop and the web facade.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fmt, fs};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Upstream CSV published by the New York State Mesonet.
pub const DEFAULT_URL: &str = "https://www.atmos.albany.edu/products/nysm/nysm_latest.csv";
/// File the store is written to, relative to the working directory.
pub const DEFAULT_STORE_PATH: &str = "nysm_latest_data.csv";
/// The origin rejects clients that do not look like a browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
/// Referer sent along with the user agent.
pub const DEFAULT_REFERER: &str = "https://www.atmos.albany.edu/";
/// Six minutes between cycles.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 360;
/// Upper bound for a single upstream request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors raised while loading or validating an `IngestConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this struct.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// The endpoint URL is not an absolute http(s) URL.
    #[error("Invalid upstream URL {0:?}")]
    InvalidUrl(String),

    /// A header name or value cannot be sent over HTTP.
    #[error("Invalid request header {name:?}")]
    InvalidHeader {
        /// Offending header name.
        name: String,
    },

    /// A numeric setting is out of range.
    #[error("Invalid value for {field}: {reason}")]
    OutOfRange {
        /// Name of the setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// # Ingest Config
///
/// Everything the polling loop and the facade need to know. Field names are
/// camelCase in JSON so the same file can be shared with the server config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngestConfig {
    /// Location of the CSV store on disk.
    pub store_path: PathBuf,
    /// Endpoint returning the latest snapshot.
    pub url: String,
    /// Headers sent with every fetch.
    pub headers: BTreeMap<String, String>,
    /// Pause after each cycle, in seconds.
    pub poll_interval_secs: u64,
    /// Timeout for one upstream request, in seconds.
    pub request_timeout_secs: u64,
    /// Transient-failure retries per fetch. Zero keeps one request per cycle.
    pub max_retries: u32,
    /// Hour (local time) of the daily reset window.
    pub reset_hour: u32,
    /// Minute (local time) of the daily reset window.
    pub reset_minute: u32,
    /// Publish merges through a temp file + rename instead of appending in place.
    pub atomic_publish: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string());
        headers.insert("Referer".to_string(), DEFAULT_REFERER.to_string());

        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            url: DEFAULT_URL.to_string(),
            headers,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: 0,
            reset_hour: 0,
            reset_minute: 0,
            atomic_publish: false,
        }
    }
}

impl IngestConfig {
    /// Loads a JSON config file. Missing fields fall back to the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field that could make the loop misbehave at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_url()?;
        self.header_map()?;

        if self.poll_interval_secs == 0 {
            return Err(ConfigError::OutOfRange {
                field: "pollIntervalSecs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::OutOfRange {
                field: "requestTimeoutSecs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.reset_hour > 23 {
            return Err(ConfigError::OutOfRange {
                field: "resetHour",
                reason: format!("{} is not an hour of the day", self.reset_hour),
            });
        }
        if self.reset_minute > 59 {
            return Err(ConfigError::OutOfRange {
                field: "resetMinute",
                reason: format!("{} is not a minute of the hour", self.reset_minute),
            });
        }
        Ok(())
    }

    /// The endpoint as an absolute http(s) URL.
    pub fn parsed_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.url).map_err(|_| ConfigError::InvalidUrl(self.url.clone()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(ConfigError::InvalidUrl(self.url.clone())),
        }
    }

    /// Builds the request header map sent with every fetch.
    pub fn header_map(&self) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(h_name), Ok(h_value)) => {
                    headers.insert(h_name, h_value);
                }
                _ => return Err(ConfigError::InvalidHeader { name: name.clone() }),
            }
        }
        Ok(headers)
    }

    /// Pause after each cycle.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Timeout for one upstream request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Display for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IngestConfig
    Store: {},
    Url: {},
    Headers: {:?},
    Poll interval: {}s,
    Request timeout: {}s,
    Max retries: {},
    Reset window: {:02}:{:02},
    Atomic publish: {}
",
            self.store_path.display(),
            self.url,
            self.headers.keys().collect::<Vec<_>>(),
            self.poll_interval_secs,
            self.request_timeout_secs,
            self.max_retries,
            self.reset_hour,
            self.reset_minute,
            self.atomic_publish
        )
    }
}
