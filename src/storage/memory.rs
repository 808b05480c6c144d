//! In-memory backend. Nothing survives the process; used for tests and
//! ephemeral runs.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{CycleRecord, StatementFilter, StatementStore, StoreStats, StoredStatement};
use crate::error::StorageError;
use crate::spocm::Statement;

#[derive(Debug, Default)]
struct Inner {
    /// Write order is preserved so queries return oldest first.
    statements: Vec<StoredStatement>,
    cycles: Vec<CycleRecord>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StorageError> {
        let guard = self
            .inner
            .read()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        if guard.closed {
            return Err(StorageError::Closed);
        }
        Ok(guard)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StorageError> {
        let guard = self
            .inner
            .write()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        if guard.closed {
            return Err(StorageError::Closed);
        }
        Ok(guard)
    }
}

impl StatementStore for MemoryStore {
    fn put(&self, statement: &Statement) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        if inner.statements.iter().any(|s| s.statement.id() == statement.id()) {
            return Err(StorageError::Conflict(statement.id().to_string()));
        }
        if let Some(old_id) = statement.supersedes() {
            let target = inner
                .statements
                .iter_mut()
                .find(|s| s.statement.id() == old_id)
                .ok_or_else(|| StorageError::SupersedeTargetMissing(old_id.to_string()))?;
            target.superseded_by = Some(statement.id().to_string());
        }
        inner.statements.push(StoredStatement {
            statement: statement.clone(),
            superseded_by: None,
            stored_at: chrono::Utc::now().to_rfc3339(),
        });
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<StoredStatement>, StorageError> {
        Ok(self
            .read()?
            .statements
            .iter()
            .find(|s| s.statement.id() == id)
            .cloned())
    }

    fn query(&self, filter: &StatementFilter) -> Result<Vec<StoredStatement>, StorageError> {
        Ok(self
            .read()?
            .statements
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    fn record_cycle(&self, record: &CycleRecord) -> Result<(), StorageError> {
        self.write()?.cycles.push(record.clone());
        Ok(())
    }

    fn cycles_for(&self, statement_id: &str) -> Result<Vec<CycleRecord>, StorageError> {
        Ok(self
            .read()?
            .cycles
            .iter()
            .filter(|c| c.statement_id == statement_id)
            .cloned()
            .collect())
    }

    fn stats(&self) -> Result<StoreStats, StorageError> {
        let inner = self.read()?;
        let mut stats = StoreStats {
            total_statements: inner.statements.len() as u64,
            ..StoreStats::default()
        };
        for s in &inner.statements {
            if s.is_current() {
                stats.current_statements += 1;
            } else {
                stats.superseded_statements += 1;
            }
            *stats
                .by_relation
                .entry(s.statement.relation().to_string())
                .or_default() += 1;
        }
        for c in &inner.cycles {
            *stats
                .cycles_by_decision
                .entry(c.decision.as_str().to_string())
                .or_default() += 1;
        }
        Ok(stats)
    }

    fn close(&self) -> Result<(), StorageError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        inner.closed = true;
        Ok(())
    }
}
