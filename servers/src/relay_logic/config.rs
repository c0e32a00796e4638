use anyhow::{Context, Result};
use clap::Parser;
use lib_common::IngestConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "server_csv_relay.conf";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Polls a CSV feed into a local store and serves it over HTTP", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "RELAY_PORT", help = "Port the web view listens on.")]
    pub port: Option<u16>,

    #[clap(long, env = "RELAY_BIND", help = "Address the web view binds to.")]
    pub bind: Option<IpAddr>,

    #[clap(long, env = "RELAY_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "RELAY_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "RELAY_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "RELAY_STORE_PATH", help = "CSV file the fetched rows are appended to.")]
    pub store_path: Option<PathBuf>,

    #[clap(long, env = "RELAY_URL", help = "Upstream CSV endpoint.")]
    pub url: Option<String>,

    #[clap(long, env = "RELAY_POLL_INTERVAL_SECS", help = "Seconds to wait after each cycle.")]
    pub poll_interval_secs: Option<u64>,

    #[clap(long, env = "RELAY_REQUEST_TIMEOUT_SECS", help = "Timeout for one upstream request, in seconds.")]
    pub request_timeout_secs: Option<u64>,

    #[clap(long, env = "RELAY_MAX_RETRIES", help = "Retries for transient fetch failures (0 = single request).")]
    pub max_retries: Option<u32>,

    #[clap(long, env = "RELAY_RESET_HOUR", help = "Local hour of the daily store reset.")]
    pub reset_hour: Option<u32>,

    #[clap(long, env = "RELAY_RESET_MINUTE", help = "Local minute of the daily store reset.")]
    pub reset_minute: Option<u32>,

    #[clap(long, env = "RELAY_ATOMIC_PUBLISH", help = "Publish merges via temp file + rename (true/false).")]
    pub atomic_publish: Option<bool>,

    // Header maps only come from the config file.
    #[clap(skip)]
    pub headers: Option<BTreeMap<String, String>>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            bind: other.bind.or(self.bind),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            store_path: other.store_path.or(self.store_path),
            url: other.url.or(self.url),
            poll_interval_secs: other.poll_interval_secs.or(self.poll_interval_secs),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            max_retries: other.max_retries.or(self.max_retries),
            reset_hour: other.reset_hour.or(self.reset_hour),
            reset_minute: other.reset_minute.or(self.reset_minute),
            atomic_publish: other.atomic_publish.or(self.atomic_publish),
            headers: other.headers.or(self.headers),
        }
    }

    fn defaults() -> Config {
        let ingest = IngestConfig::default();
        Config {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            store_path: Some(ingest.store_path),
            url: Some(ingest.url),
            poll_interval_secs: Some(ingest.poll_interval_secs),
            request_timeout_secs: Some(ingest.request_timeout_secs),
            max_retries: Some(ingest.max_retries),
            reset_hour: Some(ingest.reset_hour),
            reset_minute: Some(ingest.reset_minute),
            atomic_publish: Some(ingest.atomic_publish),
            headers: Some(ingest.headers),
            config_path: None,
        }
    }

    /// Address the web view listens on.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(
            self.bind.unwrap_or(DEFAULT_BIND),
            self.port.unwrap_or(DEFAULT_PORT),
        )
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// The part of the configuration shared by the loop and the web facade.
    pub fn ingest_config(&self) -> Result<IngestConfig> {
        let base = IngestConfig::default();
        let ingest = IngestConfig {
            store_path: self.store_path.clone().unwrap_or(base.store_path),
            url: self.url.clone().unwrap_or(base.url),
            headers: self.headers.clone().unwrap_or(base.headers),
            poll_interval_secs: self.poll_interval_secs.unwrap_or(base.poll_interval_secs),
            request_timeout_secs: self.request_timeout_secs.unwrap_or(base.request_timeout_secs),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            reset_hour: self.reset_hour.unwrap_or(base.reset_hour),
            reset_minute: self.reset_minute.unwrap_or(base.reset_minute),
            atomic_publish: self.atomic_publish.unwrap_or(base.atomic_publish),
        };
        ingest.validate()?;
        Ok(ingest)
    }
}

fn read_config_file(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let parsed = serde_json::from_str::<Config>(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(Some(parsed))
}

/// Layers defaults, then the JSON config file, then environment and CLI.
pub fn resolve(cli: Config) -> Result<Config> {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();
    if let Some(file_config) = read_config_file(&config_file_path)? {
        current_config = current_config.merge(file_config);
    }

    // clap already folded the environment into `cli`.
    Ok(current_config.merge(cli))
}

pub fn load_config() -> Result<Config> {
    resolve(Config::parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Config {
        let mut argv = vec!["server_csv_relay"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.conf");
        let config = resolve(cli(&["--config-path", missing.to_str().unwrap()])).unwrap();

        assert_eq!(config.socket_addr().port(), 5000);
        let ingest = config.ingest_config().unwrap();
        assert_eq!(ingest, IngestConfig::default());
    }

    #[test]
    fn cli_overrides_file_which_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "port": 8080,
                "pollIntervalSecs": 60,
                "storePath": "from_file.csv",
                "headers": {{ "User-Agent": "relay-test" }}
            }}"#
        )
        .unwrap();

        let config = resolve(cli(&[
            "--config-path",
            file.path().to_str().unwrap(),
            "--port",
            "9090",
            "--reset-minute",
            "15",
        ]))
        .unwrap();

        assert_eq!(config.socket_addr().port(), 9090);
        let ingest = config.ingest_config().unwrap();
        assert_eq!(ingest.poll_interval_secs, 60);
        assert_eq!(ingest.store_path, PathBuf::from("from_file.csv"));
        assert_eq!(ingest.reset_minute, 15);
        assert_eq!(ingest.headers.len(), 1);
        assert_eq!(ingest.headers["User-Agent"], "relay-test");
    }

    #[test]
    fn broken_config_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let result = resolve(cli(&["--config-path", file.path().to_str().unwrap()]));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_ingest_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.conf");
        let config = resolve(cli(&[
            "--config-path",
            missing.to_str().unwrap(),
            "--reset-hour",
            "25",
        ]))
        .unwrap();
        assert!(config.ingest_config().is_err());
    }
}
