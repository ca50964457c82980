//! Metadata service: fetch-or-serve coordination.
//!
//! Two entry points share the fetch-and-store flow:
//!
//! - [`MetadataService::fetch_and_store`] always fetches now and waits for the write.
//! - [`MetadataService::get_or_trigger`] serves the stored document, or on a miss
//!   starts one detached background fetch per URL and returns immediately.

pub mod in_flight;

use std::sync::Arc;
use std::time::Duration;

use inventory_client::{FetchOutcome, Fetcher, NormalizedUrl, RetryPolicy, normalize};
use inventory_core::{AppConfig, Error, MetadataDocument, MetadataRepository};

pub use in_flight::{InFlightGuard, InFlightRegistry};

/// Result of a cache read.
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The stored document; no network call was made.
    Cached(MetadataDocument),
    /// Nothing stored yet. A background fetch is running for the URL.
    Triggered(NormalizedUrl),
}

/// Orchestrates normalization, fetching with retry, and persistence.
///
/// Cloning is cheap and every clone shares the same repository, fetch
/// client, and in-flight registry.
#[derive(Clone)]
pub struct MetadataService {
    repo: Arc<dyn MetadataRepository>,
    fetcher: Arc<dyn Fetcher>,
    retry: RetryPolicy,
    timeout: Duration,
    in_flight: InFlightRegistry,
}

impl MetadataService {
    pub fn new(
        repo: Arc<dyn MetadataRepository>, fetcher: Arc<dyn Fetcher>, retry: RetryPolicy, timeout: Duration,
    ) -> Self {
        Self { repo, fetcher, retry, timeout, in_flight: InFlightRegistry::new() }
    }

    /// Build a service using the retry and timeout settings from `config`.
    pub fn from_config(repo: Arc<dyn MetadataRepository>, fetcher: Arc<dyn Fetcher>, config: &AppConfig) -> Self {
        Self::new(repo, fetcher, RetryPolicy::from(config), config.timeout())
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    /// Fetch `raw_url` now and upsert its metadata.
    ///
    /// Does not consult the in-flight registry: concurrent calls for the same
    /// URL each fetch, and the last upsert to complete wins.
    ///
    /// # Errors
    ///
    /// - `InvalidUrl` before any network call
    /// - `Unreachable` when the fetch fails permanently or exhausts its retries
    /// - a storage error when the upsert fails
    pub async fn fetch_and_store(&self, raw_url: &str) -> Result<MetadataDocument, Error> {
        let url = normalize(raw_url)?;
        self.collect(&url).await
    }

    /// Return the stored document for `raw_url`, or trigger a background fetch.
    ///
    /// On a miss, the caller that wins the in-flight marker spawns the fetch;
    /// every other concurrent caller just returns `Triggered`. Background
    /// failures are logged and leave the store unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidUrl` for malformed input
    /// - a storage error when the lookup fails
    pub async fn get_or_trigger(&self, raw_url: &str) -> Result<Lookup, Error> {
        let url = normalize(raw_url)?;

        if let Some(doc) = self.repo.find_by_url(url.as_str()).await? {
            tracing::debug!(url = %url, "metadata cache hit");
            return Ok(Lookup::Cached(doc));
        }

        match self.in_flight.try_acquire(url.as_str()) {
            Some(guard) => {
                tracing::debug!(url = %url, "metadata cache miss, triggering background fetch");
                self.spawn_collect(url.clone(), guard);
            }
            None => tracing::debug!(url = %url, "metadata cache miss, fetch already in flight"),
        }

        Ok(Lookup::Triggered(url))
    }

    /// Run the fetch-and-store flow detached from the caller.
    ///
    /// The task owns `guard`, so the marker is released on every exit path.
    fn spawn_collect(&self, url: NormalizedUrl, guard: InFlightGuard) {
        let service = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = service.collect(&url).await {
                tracing::error!(url = %url, error = %e, "background metadata fetch failed");
            }
        });
    }

    /// Fetch with retry, then upsert on success.
    async fn collect(&self, url: &NormalizedUrl) -> Result<MetadataDocument, Error> {
        match self.retry.fetch_with_retry(self.fetcher.as_ref(), url, self.timeout).await {
            FetchOutcome::Success(fetched) => {
                let stored = self.repo.upsert(&fetched.into_document(url)).await?;
                tracing::info!(url = %url, status = stored.status_code, "metadata stored");
                Ok(stored)
            }
            FetchOutcome::TransientFailure { reason } | FetchOutcome::PermanentFailure { reason } => {
                Err(Error::Unreachable(format!("failed to fetch {url}: {reason}")))
            }
        }
    }
}
