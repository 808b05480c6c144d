//! SQL DDL for the SQLite backend.
//!
//! Defines the `statements`, `cycle_log` and `schema_meta` tables. All DDL
//! uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Accepted statements. `body` is the full statement as JSON.
CREATE TABLE IF NOT EXISTS statements (
    id TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL,
    subject_type TEXT NOT NULL,
    relation TEXT NOT NULL,
    identity_key TEXT NOT NULL,
    confidence REAL CHECK(confidence IS NULL OR (confidence >= 0.0 AND confidence <= 1.0)),
    body TEXT NOT NULL,
    supersedes TEXT,
    superseded_by TEXT,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_statements_subject_relation ON statements(subject_id, relation);
CREATE INDEX IF NOT EXISTS idx_statements_identity ON statements(identity_key);
CREATE INDEX IF NOT EXISTS idx_statements_superseded ON statements(superseded_by);

-- One row per finished K-Cycle, whatever the decision.
CREATE TABLE IF NOT EXISTS cycle_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    statement_id TEXT NOT NULL,
    identity_key TEXT NOT NULL,
    subject_id TEXT NOT NULL,
    relation TEXT NOT NULL,
    decision TEXT NOT NULL CHECK(decision IN ('accepted','rejected','quarantined')),
    confidence REAL,
    violations TEXT NOT NULL,
    audit TEXT NOT NULL,
    registry_version INTEGER NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cycle_log_statement ON cycle_log(statement_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
