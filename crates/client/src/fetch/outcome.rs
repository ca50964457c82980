//! Fetch outcomes and their classification.
//!
//! A single fetch ends in one of three ways: a completed response, a failure
//! worth retrying, or a failure that retrying cannot fix.
//!
//! ### Transient
//! - Timeouts, refused/reset connections, temporary DNS failures
//! - 408, 429 and 5xx responses under [`ServerErrorPolicy::Retry`]
//!
//! ### Permanent
//! - DNS name does not exist, TLS/certificate rejection
//! - Redirect loops, unparseable responses, status codes outside 100-599

use std::collections::BTreeMap;

use inventory_core::{MetadataDocument, ServerErrorPolicy};

use super::url::NormalizedUrl;

/// Metadata captured from a completed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMetadata {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub page_source: Option<String>,
}

impl FetchedMetadata {
    /// Build the unsaved document for `url`.
    pub fn into_document(self, url: &NormalizedUrl) -> MetadataDocument {
        MetadataDocument::new(url.as_str(), self.status_code, self.headers, self.cookies, self.page_source)
    }
}

/// Result of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(FetchedMetadata),
    TransientFailure { reason: String },
    PermanentFailure { reason: String },
}

impl FetchOutcome {
    pub fn transient(reason: impl Into<String>) -> Self {
        FetchOutcome::TransientFailure { reason: reason.into() }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        FetchOutcome::PermanentFailure { reason: reason.into() }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, FetchOutcome::TransientFailure { .. })
    }
}

/// Error-chain fragments that mark a failure as permanent.
const PERMANENT_MARKERS: &[&str] = &[
    // TLS
    "certificate",
    "handshake",
    // DNS name does not exist
    "name or service not known",
    "no such host",
    "nodename nor servname",
    "no address associated with hostname",
    // unparseable response head
    "parsed",
    "message head is too large",
];

/// Error-chain fragments that mark a body failure as transient.
const RESET_MARKERS: &[&str] = &["connection reset", "broken pipe", "connection closed", "unexpected eof"];

/// Classify a response status. `None` means the response is a completed fetch.
pub fn classify_status(status: u16, policy: ServerErrorPolicy) -> Option<FetchOutcome> {
    if !(100..=599).contains(&status) {
        return Some(FetchOutcome::permanent(format!("malformed response: status {status}")));
    }

    match (status, policy) {
        (408 | 429, ServerErrorPolicy::Retry) => Some(FetchOutcome::transient(format!("status {status}"))),
        (500..=599, ServerErrorPolicy::Retry) => Some(FetchOutcome::transient(format!("server error: status {status}"))),
        _ => None,
    }
}

/// Full error chain as one lowercased string.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ").to_lowercase()
}

fn has_marker(chain: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| chain.contains(m))
}

/// Classify a transport error from reqwest.
pub fn classify_error(err: &reqwest::Error) -> FetchOutcome {
    let chain = error_chain(err);

    if err.is_timeout() {
        return FetchOutcome::transient(format!("timed out: {chain}"));
    }
    if has_marker(&chain, PERMANENT_MARKERS) {
        return FetchOutcome::permanent(chain);
    }
    if err.is_redirect() || err.is_builder() {
        return FetchOutcome::permanent(chain);
    }
    if err.is_body() || err.is_decode() {
        if has_marker(&chain, RESET_MARKERS) {
            return FetchOutcome::transient(chain);
        }
        return FetchOutcome::permanent(format!("malformed response: {chain}"));
    }

    // connect and send failures
    FetchOutcome::transient(chain)
}
