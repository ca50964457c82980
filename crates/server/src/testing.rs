//! Test doubles shared by the service and tool tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use inventory_client::{FetchOutcome, FetchedMetadata, Fetcher, NormalizedUrl, RetryPolicy};
use inventory_core::{Error, MetadataDocument, MetadataRepository};
use tokio::sync::Semaphore;

use crate::service::MetadataService;

enum Behavior {
    Succeed(u16),
    Transient,
    Permanent,
    Panic,
}

/// Fetcher returning a fixed outcome and counting calls.
///
/// With a gate attached every call waits for a semaphore permit first.
pub struct FakeFetcher {
    behavior: Behavior,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    fn with(behavior: Behavior) -> Self {
        Self { behavior, gate: None, calls: AtomicUsize::new(0) }
    }

    pub fn succeeding(status_code: u16) -> Self {
        Self::with(Behavior::Succeed(status_code))
    }

    pub fn transient() -> Self {
        Self::with(Behavior::Transient)
    }

    pub fn permanent() -> Self {
        Self::with(Behavior::Permanent)
    }

    pub fn panicking() -> Self {
        Self::with(Behavior::Panic)
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, _url: &NormalizedUrl, _timeout: Duration) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
        match self.behavior {
            Behavior::Succeed(status_code) => FetchOutcome::Success(FetchedMetadata {
                status_code,
                headers: BTreeMap::from([("content-type".to_string(), "text/html".to_string())]),
                cookies: BTreeMap::from([("session".to_string(), "abc123".to_string())]),
                page_source: Some("<html></html>".to_string()),
            }),
            Behavior::Transient => FetchOutcome::transient("operation timed out"),
            Behavior::Permanent => FetchOutcome::permanent("dns error: no such host"),
            Behavior::Panic => panic!("fetcher exploded"),
        }
    }
}

/// Repository whose writes always fail; lookups fail too unless built
/// with [`BrokenRepository::failing_writes`].
pub struct BrokenRepository {
    lookups_fail: bool,
}

impl BrokenRepository {
    pub fn failing() -> Self {
        Self { lookups_fail: true }
    }

    pub fn failing_writes() -> Self {
        Self { lookups_fail: false }
    }
}

#[async_trait::async_trait]
impl MetadataRepository for BrokenRepository {
    async fn upsert(&self, _doc: &MetadataDocument) -> Result<MetadataDocument, Error> {
        Err(Error::Corrupt("disk on fire".to_string()))
    }

    async fn find_by_url(&self, _url: &str) -> Result<Option<MetadataDocument>, Error> {
        if self.lookups_fail { Err(Error::Corrupt("disk on fire".to_string())) } else { Ok(None) }
    }
}

/// Service with millisecond backoff so retry tests stay fast.
pub fn service_with(
    repo: Arc<dyn MetadataRepository>, fetcher: Arc<dyn Fetcher>, max_retries: u32,
) -> MetadataService {
    let retry = RetryPolicy { max_retries, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(4) };
    MetadataService::new(repo, fetcher, retry, Duration::from_secs(1))
}

/// Parse the JSON text of a tool result's first content item.
pub fn output_json(result: &rmcp::model::CallToolResult) -> serde_json::Value {
    let text = result.content.first().and_then(|c| c.as_text()).map(|t| t.text.clone()).unwrap();
    serde_json::from_str(&text).unwrap()
}
