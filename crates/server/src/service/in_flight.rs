//! Process-wide registry of URLs with a background fetch in progress.
//!
//! `try_begin` is a single insert into a sharded concurrent set, so at most
//! one caller wins per URL. No shard lock is held across an await point.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;

/// How often [`InFlightRegistry::drain`] re-checks the registry.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Shared set of normalized URLs currently being fetched in the background.
#[derive(Clone, Debug, Default)]
pub struct InFlightRegistry {
    urls: Arc<DashSet<String>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `url` as in flight. Returns false if it already was.
    pub fn try_begin(&self, url: &str) -> bool {
        self.urls.insert(url.to_owned())
    }

    /// Clear the marker for `url`. No-op if absent.
    pub fn end(&self, url: &str) {
        self.urls.remove(url);
    }

    /// [`try_begin`](Self::try_begin) returning a guard that calls
    /// [`end`](Self::end) when dropped, including during unwinding.
    pub fn try_acquire(&self, url: &str) -> Option<InFlightGuard> {
        self.try_begin(url)
            .then(|| InFlightGuard { registry: self.clone(), url: url.to_string() })
    }

    #[cfg(test)]
    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Wait for every in-flight fetch to finish, up to `limit`.
    ///
    /// Returns true if the registry emptied in time.
    pub async fn drain(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, async {
            while !self.is_empty() {
                tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            }
        })
        .await
        .is_ok()
    }
}

/// Ownership of one URL's in-flight marker.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: InFlightRegistry,
    url: String,
}

impl InFlightGuard {
    #[cfg(test)]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.end(&self.url);
        tracing::trace!(url = %self.url, "in-flight marker released");
    }
}
