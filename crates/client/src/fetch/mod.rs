//! HTTP metadata fetch pipeline.
//!
//! ### URL Normalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments, ensure a `/` path
//! - Preserve query string
//!
//! ### Single Attempt
//! - One GET per call, bounded by the supplied timeout
//! - Follows redirects up to a limit; metadata describes the final response
//! - Page source is captured up to `max_bytes` and the rest is not read
//!
//! ### Retry
//! - [`RetryPolicy`] wraps any [`Fetcher`] with exponential backoff on
//!   transient failures only.

pub mod outcome;
pub mod retry;
pub mod url;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use inventory_core::{AppConfig, Error, ServerErrorPolicy};
use reqwest::{Client, header};

pub use outcome::{FetchOutcome, FetchedMetadata, classify_error, classify_status};
pub use retry::RetryPolicy;
pub use url::{NormalizedUrl, UrlError, normalize};

/// Issues a single outbound fetch. Implementations never retry.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` once, returning promptly once `timeout` elapses.
    async fn fetch(&self, url: &NormalizedUrl, timeout: Duration) -> FetchOutcome;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "MetadataInventoryBot/1.0")
    pub user_agent: String,

    /// Maximum page source kept per response (default: 5MB)
    pub max_bytes: usize,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Verify TLS certificates (default: true)
    pub verify_ssl: bool,

    /// Classification of 5xx responses (default: record)
    pub server_errors: ServerErrorPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            max_redirects: config.http_max_redirects,
            verify_ssl: config.http_verify_ssl,
            server_errors: config.server_error_policy,
        }
    }
}

/// Lowercased header names; repeated headers joined with `", "`.
fn collect_headers(headers: &header::HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

/// reqwest-backed fetch client sharing one connection pool.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .danger_accept_invalid_certs(!config.verify_ssl)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }
}

#[async_trait::async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, url: &NormalizedUrl, timeout: Duration) -> FetchOutcome {
        let start = Instant::now();

        let mut response = match self.http.get(url.as_str()).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };

        let status = response.status().as_u16();
        if let Some(failure) = classify_status(status, self.config.server_errors) {
            return failure;
        }

        let headers = collect_headers(response.headers());
        let cookies: BTreeMap<String, String> = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();

        let mut body: Vec<u8> = Vec::new();
        while body.len() < self.config.max_bytes {
            match response.chunk().await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => return classify_error(&e),
            }
        }
        body.truncate(self.config.max_bytes);

        tracing::debug!(
            url = %url,
            final_url = %response.url(),
            status,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched metadata"
        );

        FetchOutcome::Success(FetchedMetadata {
            status_code: status,
            headers,
            cookies,
            page_source: Some(String::from_utf8_lossy(&body).into_owned()),
        })
    }
}
