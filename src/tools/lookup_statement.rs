use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LookupStatementParams {
    #[schemars(description = "ID of the statement (or rejected candidate) to look up")]
    pub id: String,

    #[schemars(description = "If true, include the K-Cycle audit records for this id")]
    pub include_audit: Option<bool>,
}
