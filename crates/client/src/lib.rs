//! Client code for the metadata inventory.
//!
//! This crate provides URL normalization, the single-attempt HTTP fetch
//! client, outcome classification, and the retry policy used by the server.

pub mod fetch;

pub use fetch::{
    FetchClient, FetchConfig, FetchOutcome, FetchedMetadata, Fetcher, NormalizedUrl, RetryPolicy, UrlError, normalize,
};
