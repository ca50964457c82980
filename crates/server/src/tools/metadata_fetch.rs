//! metadata_fetch tool implementation.
//!
//! Fetches a URL now, stores its metadata, and returns the stored record.

use inventory_core::{Error, MetadataView};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::service::MetadataService;

/// Input parameters for the metadata_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MetadataFetchParams {
    /// The URL to collect. A missing scheme defaults to https.
    pub url: String,
}

/// Output from the metadata_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MetadataFetchOutput {
    pub message: String,
    /// Always 200 on success.
    pub http_status: u16,
    pub metadata: MetadataView,
}

/// Implementation of the metadata_fetch tool.
pub async fn fetch_impl(service: &MetadataService, params: MetadataFetchParams) -> Result<CallToolResult, McpError> {
    let doc = match service.fetch_and_store(&params.url).await {
        Ok(doc) => doc,
        Err(e) => {
            match &e {
                Error::Unreachable(_) => tracing::warn!(url = %params.url, error = %e, "metadata fetch failed"),
                e if e.is_storage() => tracing::error!(url = %params.url, error = %e, "metadata store failed"),
                _ => tracing::debug!(url = %params.url, error = %e, "metadata fetch rejected"),
            }
            return Err(e.into());
        }
    };

    let output = MetadataFetchOutput {
        message: format!("Metadata stored for {}", doc.url),
        http_status: 200,
        metadata: doc.view(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize metadata: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
