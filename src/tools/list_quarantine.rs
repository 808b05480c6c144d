//! MCP `list_quarantine` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `list_quarantine` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListQuarantineParams {
    /// Optional subject id to filter the review queue by.
    #[schemars(description = "Optional subject id to filter by")]
    pub subject_id: Option<String>,
}
