//! Storage contract and backends.
//!
//! [`StatementStore`] is the uniform contract the engine persists through.
//! Backends resolve supersession: a put whose statement `supersedes` another
//! marks the target as historical in the same write.

pub mod memory;
pub mod sqlite;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::kcycle::{AuditEntry, Decision, Violation};
use crate::spocm::Statement;

/// A persisted statement plus its storage-side lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredStatement {
    pub statement: Statement,
    /// Id of the statement that replaced this one, if any.
    pub superseded_by: Option<String>,
    /// ISO 8601 time the statement was written.
    pub stored_at: String,
}

impl StoredStatement {
    pub fn is_current(&self) -> bool {
        self.superseded_by.is_none()
    }
}

/// Simple attribute match over stored statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFilter {
    pub subject_id: String,
    pub relation: Option<String>,
    /// Include historical (superseded) statements.
    pub include_superseded: bool,
}

impl StatementFilter {
    /// Current statements for a subject, optionally narrowed to one relation.
    pub fn current(subject_id: &str, relation: Option<&str>) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            relation: relation.map(str::to_string),
            include_superseded: false,
        }
    }

    pub fn with_history(mut self) -> Self {
        self.include_superseded = true;
        self
    }

    pub fn matches(&self, stored: &StoredStatement) -> bool {
        let s = &stored.statement;
        s.subject().id == self.subject_id
            && self.relation.as_deref().map_or(true, |r| r == s.relation())
            && (self.include_superseded || stored.is_current())
    }
}

/// The audit record of one finished K-Cycle, kept for every decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub statement_id: String,
    pub identity_key: String,
    pub subject_id: String,
    pub relation: String,
    pub decision: Decision,
    pub confidence: Option<f64>,
    pub violations: Vec<Violation>,
    pub audit: Vec<AuditEntry>,
    pub registry_version: u64,
    pub recorded_at: String,
}

/// Counts reported by `stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_statements: u64,
    pub current_statements: u64,
    pub superseded_statements: u64,
    pub by_relation: BTreeMap<String, u64>,
    pub cycles_by_decision: BTreeMap<String, u64>,
}

/// Uniform persistence contract for accepted statements and cycle audits.
pub trait StatementStore: Send + Sync {
    /// Persist an accepted statement, applying its `supersedes` link atomically.
    fn put(&self, statement: &Statement) -> Result<(), StorageError>;

    fn get(&self, id: &str) -> Result<Option<StoredStatement>, StorageError>;

    /// Matching statements in write order.
    fn query(&self, filter: &StatementFilter) -> Result<Vec<StoredStatement>, StorageError>;

    fn record_cycle(&self, record: &CycleRecord) -> Result<(), StorageError>;

    /// Cycle records for a statement id, oldest first.
    fn cycles_for(&self, statement_id: &str) -> Result<Vec<CycleRecord>, StorageError>;

    fn stats(&self) -> Result<StoreStats, StorageError>;

    fn close(&self) -> Result<(), StorageError>;
}

/// Open the backend named in the storage configuration.
pub fn open_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn StatementStore>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(memory::MemoryStore::new())),
        "sqlite" => {
            let path = crate::config::expand_tilde(&config.db_path);
            Ok(Arc::new(sqlite::SqliteStore::open(&path)?))
        }
        other => Err(StorageError::UnknownBackend(other.to_string()).into()),
    }
}
