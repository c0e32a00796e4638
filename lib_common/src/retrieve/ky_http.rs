//! # HTTP Retrieval Utilities
//!
//! An asynchronous client wrapper around `reqwest`. Every request is bounded
//! by a timeout; transient failures are retried with exponential backoff only
//! when a retry budget is configured.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{header::HeaderMap, Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

/// A standardized container for API responses.
///
/// Wraps the body along with metadata about the HTTP transaction.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The response body, present when the status was 2xx.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// Client construction settings.
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// Upper bound for a whole request, connect to last body byte.
    pub timeout: Duration,
    /// Retries on transient failures. Zero disables the retry middleware.
    pub max_retries: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 0,
        }
    }
}

/// A middleware-enabled asynchronous HTTP client.
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
}

impl ApiClient {
    /// Builds a client with the given timeout and retry budget.
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(options: ClientOptions) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;

        let mut builder = ClientBuilder::new(client);
        if options.max_retries > 0 {
            let retry_policy =
                ExponentialBackoff::builder().build_with_max_retries(options.max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            inner: builder.build(),
        })
    }

    /// Performs a request and returns the raw body.
    ///
    /// Non-2xx statuses are not errors: they come back with `success: false`
    /// and the body in `error_body`.
    ///
    /// # Errors
    /// Returns an error on transport failures, including timeouts.
    pub async fn request_bytes(
        &self,
        method: Method,
        url: Url,
        headers: Option<HeaderMap>,
    ) -> anyhow::Result<ApiResponse<Bytes>> {
        let mut req = self.inner.request(method, url);
        if let Some(h) = headers {
            req = req.headers(h);
        }

        let response: reqwest::Response = req.send().await?;
        let status = response.status();
        let resp_headers = response.headers().clone();

        if status.is_success() {
            let data = response.bytes().await?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers: resp_headers,
            })
        } else {
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
                headers: resp_headers,
            })
        }
    }

    /// Shorthand for a `GET` returning the raw body.
    pub async fn get_bytes(
        &self,
        url: Url,
        headers: Option<HeaderMap>,
    ) -> anyhow::Result<ApiResponse<Bytes>> {
        self.request_bytes(Method::GET, url, headers).await
    }
}
