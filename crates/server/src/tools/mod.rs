//! MCP tool implementations.
//!
//! This module contains all tools exposed by the metadata-inventory server.

pub mod metadata_fetch;
pub mod metadata_get;

pub use metadata_fetch::{MetadataFetchParams, fetch_impl};
pub use metadata_get::{MetadataGetParams, get_impl};
