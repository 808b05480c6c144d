//! SQLite backend.
//!
//! Statements are stored as a JSON body plus the indexed columns needed for
//! subject/relation lookups. Supersession is applied inside the same
//! transaction as the insert, so a failed put leaves no partial state.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::{CycleRecord, StatementFilter, StatementStore, StoreStats, StoredStatement};
use crate::db;
use crate::error::StorageError;
use crate::kcycle::Decision;
use crate::spocm::Statement;

pub struct SqliteStore {
    /// `None` once closed.
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file with schema and migrations applied.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::from_connection(db::open_memory_database()?))
    }

    /// Wrap a connection whose schema is already initialized.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>, StorageError> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))
    }
}

/// Columns selected for every statement read, in this order.
const STATEMENT_COLUMNS: &str = "body, superseded_by, stored_at";

type StatementRow = (String, Option<String>, String);

fn read_statement_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StatementRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn decode_statement(row: StatementRow) -> Result<StoredStatement, StorageError> {
    let (body, superseded_by, stored_at) = row;
    Ok(StoredStatement {
        statement: serde_json::from_str(&body)?,
        superseded_by,
        stored_at,
    })
}

fn parse_decision(idx: usize, raw: String) -> rusqlite::Result<Decision> {
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

impl StatementStore for SqliteStore {
    fn put(&self, statement: &Statement) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let conn = guard.as_mut().ok_or(StorageError::Closed)?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM statements WHERE id = ?1)",
            params![statement.id()],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StorageError::Conflict(statement.id().to_string()));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let body = serde_json::to_string(statement)?;
        tx.execute(
            "INSERT INTO statements (id, subject_id, subject_type, relation, identity_key, confidence, body, supersedes, stored_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                statement.id(),
                statement.subject().id,
                statement.subject().subject_type,
                statement.relation(),
                statement.identity_key(),
                statement.metadata().confidence,
                body,
                statement.supersedes(),
                now,
            ],
        )?;

        if let Some(old_id) = statement.supersedes() {
            let updated = tx.execute(
                "UPDATE statements SET superseded_by = ?1 WHERE id = ?2 AND id != ?1",
                params![statement.id(), old_id],
            )?;
            if updated == 0 {
                // dropping the transaction rolls back the insert
                return Err(StorageError::SupersedeTargetMissing(old_id.to_string()));
            }
        }

        tx.commit()?;
        tracing::debug!(statement_id = statement.id(), "statement stored");
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<StoredStatement>, StorageError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StorageError::Closed)?;
        let row = conn
            .query_row(
                &format!("SELECT {STATEMENT_COLUMNS} FROM statements WHERE id = ?1"),
                params![id],
                read_statement_row,
            )
            .optional()?;
        row.map(decode_statement).transpose()
    }

    fn query(&self, filter: &StatementFilter) -> Result<Vec<StoredStatement>, StorageError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StorageError::Closed)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STATEMENT_COLUMNS} FROM statements \
             WHERE subject_id = ?1 \
             AND (?2 IS NULL OR relation = ?2) \
             AND (?3 OR superseded_by IS NULL) \
             ORDER BY rowid"
        ))?;
        let rows = stmt
            .query_map(
                params![filter.subject_id, filter.relation, filter.include_superseded],
                read_statement_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(decode_statement).collect()
    }

    fn record_cycle(&self, record: &CycleRecord) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let conn = guard.as_mut().ok_or(StorageError::Closed)?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO cycle_log (statement_id, identity_key, subject_id, relation, decision, confidence, violations, audit, registry_version, recorded_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.statement_id,
                record.identity_key,
                record.subject_id,
                record.relation,
                record.decision.as_str(),
                record.confidence,
                serde_json::to_string(&record.violations)?,
                serde_json::to_string(&record.audit)?,
                record.registry_version as i64,
                record.recorded_at,
            ],
        )?;
        db::migrations::set_registry_version(&tx, record.registry_version)?;
        tx.commit()?;
        Ok(())
    }

    fn cycles_for(&self, statement_id: &str) -> Result<Vec<CycleRecord>, StorageError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StorageError::Closed)?;
        let mut stmt = conn.prepare(
            "SELECT statement_id, identity_key, subject_id, relation, decision, confidence, violations, audit, registry_version, recorded_at \
             FROM cycle_log WHERE statement_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![statement_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    parse_decision(4, row.get(4)?)?,
                    row.get::<_, Option<f64>>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, i64>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(
                    statement_id,
                    identity_key,
                    subject_id,
                    relation,
                    decision,
                    confidence,
                    violations,
                    audit,
                    registry_version,
                    recorded_at,
                )| {
                    Ok(CycleRecord {
                        statement_id,
                        identity_key,
                        subject_id,
                        relation,
                        decision,
                        confidence,
                        violations: serde_json::from_str(&violations)?,
                        audit: serde_json::from_str(&audit)?,
                        registry_version: registry_version as u64,
                        recorded_at,
                    })
                },
            )
            .collect()
    }

    fn stats(&self) -> Result<StoreStats, StorageError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(StorageError::Closed)?;

        let (total, current): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN superseded_by IS NULL THEN 1 ELSE 0 END), 0) FROM statements",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stats = StoreStats {
            total_statements: total as u64,
            current_statements: current as u64,
            superseded_statements: (total - current) as u64,
            ..StoreStats::default()
        };

        let mut stmt = conn.prepare("SELECT relation, COUNT(*) FROM statements GROUP BY relation")?;
        let by_relation = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (relation, count) in by_relation {
            stats.by_relation.insert(relation, count as u64);
        }

        let mut stmt = conn.prepare("SELECT decision, COUNT(*) FROM cycle_log GROUP BY decision")?;
        let by_decision = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (decision, count) in by_decision {
            stats.cycles_by_decision.insert(decision, count as u64);
        }

        Ok(stats)
    }

    fn close(&self) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| StorageError::Database(e))?;
            tracing::info!("sqlite store closed");
        }
        Ok(())
    }
}
