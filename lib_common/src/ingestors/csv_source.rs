//! # Snapshot Sources
//!
//! A snapshot is one fetch of the upstream CSV. The loop only sees the
//! `SnapshotSource` trait; production uses `HttpSnapshotSource`, tests use
//! scripted sources.

use std::future::Future;

use bytes::Bytes;
use log::warn;
use reqwest::header::HeaderMap;
use url::Url;

use crate::configs::config_ingest::IngestConfig;
use crate::errors::IngestError;
use crate::retrieve::ky_http::{ApiClient, ClientOptions};

/// Anything that can hand the loop the current upstream snapshot.
pub trait SnapshotSource: Send + Sync {
    /// Fetches one snapshot. Any error means "no snapshot this cycle".
    fn fetch(&self) -> impl Future<Output = Result<Bytes, IngestError>> + Send;
}

/// Fetches the snapshot with a single GET to a fixed URL and header set.
pub struct HttpSnapshotSource {
    client: ApiClient,
    url: Url,
    headers: HeaderMap,
}

impl HttpSnapshotSource {
    /// Builds the source from the ingest configuration.
    ///
    /// # Errors
    /// Fails on an invalid URL or header, or if the HTTP client cannot be built.
    pub fn new(config: &IngestConfig) -> anyhow::Result<Self> {
        let client = ApiClient::new(ClientOptions {
            timeout: config.request_timeout(),
            max_retries: config.max_retries,
        })?;
        Ok(Self {
            client,
            url: config.parsed_url()?,
            headers: config.header_map()?,
        })
    }

    /// The endpoint this source polls.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<Bytes, IngestError> {
        let response = self
            .client
            .get_bytes(self.url.clone(), Some(self.headers.clone()))
            .await
            .map_err(|e| IngestError::Fetch(format!("{:#}", e)))?;

        if !response.success {
            if let Some(body) = response.error_body.as_deref().filter(|b| !b.is_empty()) {
                warn!(
                    "Upstream {} answered {}: {}",
                    self.url,
                    response.status,
                    body.chars().take(200).collect::<String>()
                );
            }
            return Err(IngestError::FetchStatus {
                status: response.status,
            });
        }

        Ok(response.data.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::errors::FailureClass;

    fn serve_once(response: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).unwrap_or(0);
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });

        (format!("http://127.0.0.1:{}/nysm_latest.csv", port), handle)
    }

    #[tokio::test]
    async fn sends_browser_headers_and_returns_body() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 8\r\nConnection: close\r\n\r\na,b\n1,2\n",
        );
        let config = IngestConfig {
            url,
            ..IngestConfig::default()
        };

        let source = HttpSnapshotSource::new(&config).unwrap();
        let body = source.fetch().await.unwrap();
        let request = server.join().unwrap().to_lowercase();

        assert_eq!(&body[..], b"a,b\n1,2\n");
        assert!(request.contains("user-agent: mozilla/5.0"));
        assert!(request.contains("referer: https://www.atmos.albany.edu/"));
    }

    #[tokio::test]
    async fn non_200_is_a_fetch_status_error() {
        let (url, server) =
            serve_once("HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let config = IngestConfig {
            url,
            ..IngestConfig::default()
        };

        let source = HttpSnapshotSource::new(&config).unwrap();
        let err = source.fetch().await.unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, IngestError::FetchStatus { status: 503 }));
    }

    #[tokio::test]
    async fn silent_upstream_times_out_as_a_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        // Hold the connection open past the timeout without answering.
        let server = thread::spawn(move || {
            let conn = listener.accept();
            thread::sleep(Duration::from_millis(3000));
            drop(conn);
        });
        let config = IngestConfig {
            url: format!("http://127.0.0.1:{}/nysm_latest.csv", port),
            request_timeout_secs: 1,
            ..IngestConfig::default()
        };

        let source = HttpSnapshotSource::new(&config).unwrap();
        let started = Instant::now();
        let err = source.fetch().await.unwrap_err();
        let waited = started.elapsed();
        server.join().unwrap();

        assert!(matches!(err, IngestError::Fetch(_)));
        assert_eq!(err.class(), FailureClass::Fetch);
        assert!(waited < Duration::from_millis(2500), "gave up after {:?}", waited);
    }

    #[tokio::test]
    async fn connection_refused_is_a_fetch_error() {
        // Bind then drop to get a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = IngestConfig {
            url: format!("http://127.0.0.1:{}/", port),
            ..IngestConfig::default()
        };

        let source = HttpSnapshotSource::new(&config).unwrap();
        assert!(matches!(source.fetch().await, Err(IngestError::Fetch(_))));
    }
}
