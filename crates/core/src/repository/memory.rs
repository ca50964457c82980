//! In-memory repository backend.
//!
//! Same upsert semantics as the SQLite backend, held in a HashMap behind a
//! tokio RwLock. Used for tests and for `store_backend = "memory"`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use super::MetadataRepository;
use crate::{Error, MetadataDocument};

/// Process-local metadata store.
#[derive(Clone, Debug, Default)]
pub struct MemoryRepository {
    docs: Arc<RwLock<HashMap<String, MetadataDocument>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl MetadataRepository for MemoryRepository {
    async fn upsert(&self, doc: &MetadataDocument) -> Result<MetadataDocument, Error> {
        let now = Utc::now();
        let mut docs = self.docs.write().await;

        let created_at = match docs.get(&doc.url) {
            Some(existing) => existing.created_at,
            None => doc.created_at.min(now),
        };
        let stored = MetadataDocument { created_at, updated_at: now.max(created_at), ..doc.clone() };

        docs.insert(stored.url.clone(), stored.clone());
        Ok(stored)
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<MetadataDocument>, Error> {
        Ok(self.docs.read().await.get(url).cloned())
    }
}
