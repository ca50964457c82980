//! Persistence of metadata documents keyed by normalized URL.
//!
//! The [`MetadataRepository`] trait is the single capability the service
//! depends on. Two backends implement it:
//!
//! - [`MetadataDb`]: SQLite via tokio-rusqlite, WAL mode, versioned migrations
//! - [`MemoryRepository`]: process-local map with identical upsert semantics

pub mod connection;
pub mod documents;
pub mod memory;
pub mod migrations;

use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};
use crate::{Error, MetadataDocument};

pub use connection::MetadataDb;
pub use memory::MemoryRepository;

/// Upsert-by-key and find-by-key over metadata documents.
#[async_trait::async_trait]
pub trait MetadataRepository: Send + Sync {
    /// Insert `doc`, or replace the stored document with the same `url`.
    ///
    /// `created_at` is taken from `doc` on insert and preserved on replace;
    /// `updated_at` is always set to the write time. Returns the document as stored.
    async fn upsert(&self, doc: &MetadataDocument) -> Result<MetadataDocument, Error>;

    /// Point lookup by normalized URL. `Ok(None)` means not stored.
    async fn find_by_url(&self, url: &str) -> Result<Option<MetadataDocument>, Error>;
}

/// Construct the repository selected by `config.store_backend`.
pub async fn open(config: &AppConfig) -> Result<Arc<dyn MetadataRepository>, Error> {
    match config.store_backend {
        StoreBackend::Sqlite => {
            tracing::info!(path = %config.db_path.display(), "opening sqlite metadata store");
            Ok(Arc::new(MetadataDb::open(&config.db_path).await?))
        }
        StoreBackend::Memory => {
            tracing::info!("using in-memory metadata store");
            Ok(Arc::new(MemoryRepository::new()))
        }
    }
}
