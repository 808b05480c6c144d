//! Error types for the kos runtime.
//!
//! Rule violations found during a K-Cycle are *not* errors; they travel inside
//! [`IngestResult`](crate::engine::IngestResult). The types here cover the
//! exceptional paths: bad configuration, an unusable schema, storage faults.

use thiserror::Error;

/// Top-level error for engine and runtime operations.
#[derive(Debug, Error)]
pub enum KosError {
    /// Invalid threshold or flag combination, detected at engine construction.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The orchestrator reached a (stage, outcome) pair the transition table rejects.
    #[error("invalid k-cycle transition from {stage} on {outcome}")]
    InvalidTransition { stage: String, outcome: String },

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("quarantined statement not found: {0}")]
    NotQuarantined(String),
}

/// Errors raised while building or loading an ontology.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse ontology: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate {kind} in ontology: {name}")]
    Duplicate { kind: &'static str, name: String },

    #[error("subject type {name} names unknown parent {parent}")]
    UnknownParent { name: String, parent: String },

    #[error("subject type {0} has a cyclic parent chain")]
    CyclicParent(String),

    #[error("relation {relation} references unknown subject type {subject_type}")]
    UnknownSubjectType {
        relation: String,
        subject_type: String,
    },

    #[error("relation {0} has an empty or inverted value range")]
    InvalidRange(String),
}

/// Failures reported by a [`StatementStore`](crate::storage::StatementStore) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("statement already stored: {0}")]
    Conflict(String),

    #[error("supersedes target not found: {0}")]
    SupersedeTargetMissing(String),

    #[error("storage is closed")]
    Closed,

    #[error("unknown storage backend: {0}")]
    UnknownBackend(String),

    #[error("storage lock poisoned: {0}")]
    Poisoned(String),
}

pub type KosResult<T> = Result<T, KosError>;
