//! Core types and shared functionality for the metadata inventory.
//!
//! This crate provides:
//! - The stored document model
//! - Repository trait with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod document;
pub mod error;
pub mod repository;

pub use config::{AppConfig, ConfigError, ServerErrorPolicy, StoreBackend};
pub use document::{MetadataDocument, MetadataView};
pub use error::Error;
pub use repository::{MemoryRepository, MetadataDb, MetadataRepository};
