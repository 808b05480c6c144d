use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IngestStatementParams {
    #[schemars(
        description = "SPOC-M statement as JSON: {subject: {id, type}, predicate: {relation}, object: {value}, context?, mechanism?, metadata?, supersedes?}"
    )]
    pub statement: serde_json::Value,
}
