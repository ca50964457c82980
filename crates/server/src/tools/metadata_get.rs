//! metadata_get tool implementation.
//!
//! Serves stored metadata, or schedules a background collection on a miss.

use inventory_core::{Error, MetadataView};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::service::{Lookup, MetadataService};

/// Input parameters for the metadata_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MetadataGetParams {
    /// The URL to look up. Normalized the same way as metadata_fetch.
    pub url: String,
}

/// Output from the metadata_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MetadataGetOutput {
    /// Stored metadata was found (http_status 200).
    Cached { http_status: u16, metadata: MetadataView },
    /// Nothing stored yet; collection is running (http_status 202).
    Triggered { http_status: u16, message: String },
}

/// Implementation of the metadata_get tool.
pub async fn get_impl(service: &MetadataService, params: MetadataGetParams) -> Result<CallToolResult, McpError> {
    let output = match service.get_or_trigger(&params.url).await? {
        Lookup::Cached(doc) => MetadataGetOutput::Cached { http_status: 200, metadata: doc.view() },
        Lookup::Triggered(url) => MetadataGetOutput::Triggered {
            http_status: 202,
            message: format!("No metadata yet for {url}. Collection triggered."),
        },
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize metadata: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
