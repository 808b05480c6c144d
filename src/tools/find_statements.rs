use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FindStatementsParams {
    #[schemars(description = "Subject id, e.g. 'user:001'")]
    pub subject_id: String,

    #[schemars(description = "Optional relation name to narrow the result")]
    pub relation: Option<String>,

    #[schemars(description = "If true, include superseded statements. Defaults to false.")]
    pub include_superseded: Option<bool>,
}
