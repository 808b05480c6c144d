use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReviewQuarantineParams {
    #[schemars(description = "ID of the quarantined statement")]
    pub id: String,

    #[schemars(description = "'promote' to accept it after review, 'discard' to drop it")]
    pub action: String,
}
