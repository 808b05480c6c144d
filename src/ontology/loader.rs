//! TOML ontology files.
//!
//! ```toml
//! version = 3
//!
//! [[subject_types]]
//! name = "Person"
//!
//! [[relations]]
//! name = "hasRole"
//! subject_types = ["Person"]
//! cardinality = "one"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::registry::{RelationSpec, SchemaRegistry, SubjectTypeSpec};
use crate::error::SchemaError;

#[derive(Debug, Deserialize)]
struct OntologyFile {
    #[serde(default = "first_version")]
    version: u64,
    #[serde(default)]
    subject_types: Vec<SubjectTypeSpec>,
    #[serde(default)]
    relations: Vec<RelationSpec>,
}

fn first_version() -> u64 {
    1
}

/// Parse and validate an ontology from TOML text.
pub fn from_toml_str(text: &str) -> Result<SchemaRegistry, SchemaError> {
    let file: OntologyFile = toml::from_str(text)?;
    let mut builder = SchemaRegistry::builder(file.version);
    for spec in file.subject_types {
        builder = builder.subject_type(spec);
    }
    for spec in file.relations {
        builder = builder.relation(spec);
    }
    builder.build()
}

/// Load an ontology file from disk.
pub fn load_file(path: impl AsRef<Path>) -> Result<SchemaRegistry> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ontology file {}", path.display()))?;
    let registry = from_toml_str(&text)
        .with_context(|| format!("invalid ontology file {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        version = registry.version(),
        relations = registry.relations().count(),
        subject_types = registry.subject_types().count(),
        "ontology loaded"
    );
    Ok(registry)
}
