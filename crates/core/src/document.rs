//! Stored HTTP metadata for a single URL.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-known HTTP metadata for one normalized URL.
///
/// `url` is the unique key. `created_at` is fixed on first insert and
/// `updated_at` advances on every write, so `created_at <= updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub url: String,
    pub status_code: u16,
    /// Header names are lowercased; repeated headers are joined with `", "`.
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    /// Response body as lossy UTF-8, capped at the configured byte limit.
    /// Stored for internal use only and never exposed through [`MetadataView`].
    pub page_source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MetadataDocument {
    /// Build an unsaved document stamped with the current time.
    ///
    /// The repository decides the final timestamps on write.
    pub fn new(
        url: impl Into<String>, status_code: u16, headers: BTreeMap<String, String>,
        cookies: BTreeMap<String, String>, page_source: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self { url: url.into(), status_code, headers, cookies, page_source, created_at: now, updated_at: now }
    }

    /// Public view of the document without the captured page source.
    pub fn view(&self) -> MetadataView {
        MetadataView::from(self.clone())
    }
}

/// Outbound shape of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MetadataView {
    /// Normalized URL the metadata belongs to.
    pub url: String,
    /// HTTP status code of the last successful fetch.
    pub status_code: u16,
    /// Response headers keyed by lowercased name.
    pub headers: BTreeMap<String, String>,
    /// Cookies set by the response.
    pub cookies: BTreeMap<String, String>,
    /// First time this URL was stored.
    pub created_at: DateTime<Utc>,
    /// Most recent write.
    pub updated_at: DateTime<Utc>,
}

impl From<MetadataDocument> for MetadataView {
    fn from(doc: MetadataDocument) -> Self {
        Self {
            url: doc.url,
            status_code: doc.status_code,
            headers: doc.headers,
            cookies: doc.cookies,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_timestamps_match() {
        let doc = MetadataDocument::new("https://example.com/", 200, BTreeMap::new(), BTreeMap::new(), None);
        assert_eq!(doc.created_at, doc.updated_at);
        assert_eq!(doc.status_code, 200);
    }

    #[test]
    fn test_view_excludes_page_source() {
        let doc = MetadataDocument::new(
            "https://example.com/",
            200,
            BTreeMap::from([("content-type".to_string(), "text/html".to_string())]),
            BTreeMap::new(),
            Some("<html></html>".to_string()),
        );

        let json = serde_json::to_value(doc.view()).unwrap();
        assert!(json.get("page_source").is_none());
        assert_eq!(json["url"], "https://example.com/");
        assert_eq!(json["headers"]["content-type"], "text/html");
    }
}
