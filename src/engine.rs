//! Knowledge Engine: the façade callers ingest through.
//!
//! [`KnowledgeEngine::ingest`] runs a candidate through the K-Cycle and, on
//! acceptance, persists it. At most one acceptance is in flight per
//! (subject id, relation): the cardinality read in OOS and the following
//! `put` happen under a per-key lock. Quarantined candidates wait in an
//! in-process holding area until [`promote`](KnowledgeEngine::promote)d or
//! [`discard`](KnowledgeEngine::discard)ed.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::config::check_unit_interval;
use crate::error::{KosError, KosResult, StorageError};
use crate::kcycle::oos::{self, OosVerdict};
use crate::kcycle::{run_cycle, AuditEntry, CycleConfig, CycleReport, Decision, Stage, Violation};
use crate::ontology::{RegistryHandle, SchemaRegistry};
use crate::spocm::{Metadata, Statement};
use crate::storage::{CycleRecord, StatementFilter, StatementStore, StoreStats, StoredStatement};

/// What happened to the durable write after the decision was made.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum Persistence {
    /// Written to storage.
    Stored,
    /// An identical statement was already current; nothing was written.
    Deduplicated,
    /// Not accepted, so nothing to write.
    NotApplicable,
    /// Accepted but not durably recorded. Retry ingestion.
    Failed(String),
}

/// Outcome of one ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestResult {
    pub decision: Decision,
    /// Id of the candidate as submitted.
    pub candidate_id: String,
    /// The accepted (possibly pre-existing) or quarantined statement.
    pub statement: Option<Statement>,
    pub confidence: Option<f64>,
    pub violations: Vec<Violation>,
    pub audit: Vec<AuditEntry>,
    pub persistence: Persistence,
    pub registry_version: u64,
    /// False when the cycle record could not be written.
    pub cycle_recorded: bool,
}

impl IngestResult {
    /// Accepted by validation but not persisted.
    pub fn is_storage_failure(&self) -> bool {
        self.decision == Decision::Accepted && matches!(self.persistence, Persistence::Failed(_))
    }
}

/// A candidate held for manual review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarantinedStatement {
    /// Candidate carrying its resolved confidence.
    pub statement: Statement,
    pub confidence: f64,
    pub violations: Vec<Violation>,
    pub audit: Vec<AuditEntry>,
    pub registry_version: u64,
    pub quarantined_at: DateTime<Utc>,
}

type LockKey = (String, String);

pub struct KnowledgeEngine {
    store: Arc<dyn StatementStore>,
    registry: RegistryHandle,
    config: CycleConfig,
    key_locks: DashMap<LockKey, Arc<Mutex<()>>>,
    quarantine: DashMap<String, QuarantinedStatement>,
}

impl KnowledgeEngine {
    /// Build an engine. Fails with [`KosError::Configuration`] when the
    /// threshold or default confidence lies outside [0, 1].
    pub fn new(
        store: Arc<dyn StatementStore>,
        registry: SchemaRegistry,
        config: CycleConfig,
    ) -> KosResult<Self> {
        check_unit_interval("quarantine_threshold", config.quarantine_threshold)?;
        check_unit_interval("default_confidence", config.default_confidence)?;
        if config.switches.strict_mode && !config.switches.vqf_enabled {
            tracing::warn!("strict_mode has no effect while vqf_enabled is false");
        }
        tracing::info!(
            registry_version = registry.version(),
            oos_enabled = config.switches.oos_enabled,
            vqf_enabled = config.switches.vqf_enabled,
            strict_mode = config.switches.strict_mode,
            quarantine_threshold = config.quarantine_threshold,
            "knowledge engine ready"
        );
        Ok(Self {
            store,
            registry: RegistryHandle::new(registry),
            config,
            key_locks: DashMap::new(),
            quarantine: DashMap::new(),
        })
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Snapshot of the registry new cycles run against.
    pub fn registry(&self) -> KosResult<Arc<SchemaRegistry>> {
        self.registry.snapshot()
    }

    /// Install a new registry. Cycles already running keep their snapshot.
    /// Returns the previous version number.
    pub fn swap_registry(&self, registry: SchemaRegistry) -> KosResult<u64> {
        Ok(self.registry.swap(registry)?.version())
    }

    /// Run `f` holding the acceptance lock for the statement's
    /// (subject id, relation). The lock entry is dropped again once no other
    /// caller holds it.
    fn with_key_lock<T>(
        &self,
        statement: &Statement,
        f: impl FnOnce() -> KosResult<T>,
    ) -> KosResult<T> {
        let key: LockKey = (
            statement.subject().id.clone(),
            statement.relation().to_string(),
        );
        // clone out so the shard guard is released before we block on the mutex
        let lock = self.key_locks.entry(key.clone()).or_default().clone();
        let result = match lock.lock() {
            Ok(_guard) => f(),
            Err(e) => Err(KosError::LockPoisoned(format!("acceptance lock: {e}"))),
        };
        drop(lock);
        self.key_locks
            .remove_if(&key, |_, l| Arc::strong_count(l) == 1);
        result
    }

    /// Validate a candidate and persist it if accepted.
    pub fn ingest(&self, candidate: Statement) -> KosResult<IngestResult> {
        let registry = self.registry.snapshot()?;
        self.with_key_lock(&candidate, || self.ingest_locked(&candidate, &registry))
    }

    fn ingest_locked(
        &self,
        candidate: &Statement,
        registry: &SchemaRegistry,
    ) -> KosResult<IngestResult> {
        let report = run_cycle(candidate, registry, self.store.as_ref(), &self.config)?;
        let CycleReport {
            decision,
            statement,
            confidence,
            violations,
            audit,
            registry_version,
        } = report;

        let (kept, persistence) = match decision {
            Decision::Accepted => {
                let (kept, persistence) = self.persist_accepted(statement);
                (Some(kept), persistence)
            }
            Decision::Quarantined => {
                let held = QuarantinedStatement {
                    statement: statement.clone(),
                    confidence: confidence.unwrap_or(self.config.default_confidence),
                    violations: violations.clone(),
                    audit: audit.clone(),
                    registry_version,
                    quarantined_at: Utc::now(),
                };
                self.quarantine.insert(statement.id().to_string(), held);
                (Some(statement), Persistence::NotApplicable)
            }
            Decision::Rejected => (None, Persistence::NotApplicable),
        };

        let record = CycleRecord {
            statement_id: candidate.id().to_string(),
            identity_key: candidate.identity_key(),
            subject_id: candidate.subject().id.clone(),
            relation: candidate.relation().to_string(),
            decision,
            confidence,
            violations: violations.clone(),
            audit: audit.clone(),
            registry_version,
            recorded_at: Utc::now().to_rfc3339(),
        };
        let cycle_recorded = self.record(&record);

        Ok(IngestResult {
            decision,
            candidate_id: candidate.id().to_string(),
            statement: kept,
            confidence,
            violations,
            audit,
            persistence,
            registry_version,
            cycle_recorded,
        })
    }

    /// Write an accepted statement, collapsing exact re-ingestion and turning
    /// a same-identity statement with new metadata into a revision.
    fn persist_accepted(&self, statement: Statement) -> (Statement, Persistence) {
        let key = statement.identity_key();
        let current = match self.store.query(&StatementFilter::current(
            &statement.subject().id,
            Some(statement.relation()),
        )) {
            Ok(current) => current,
            Err(e) => return not_persisted(statement, e),
        };
        let same_identity = current
            .into_iter()
            .find(|s| s.statement.identity_key() == key);

        let to_store = match same_identity {
            Some(existing) if is_duplicate(&existing.statement, &statement) => {
                tracing::info!(
                    statement_id = %existing.statement.id(),
                    "identical statement already stored"
                );
                return (existing.statement, Persistence::Deduplicated);
            }
            Some(existing)
                if statement.supersedes().is_none() && existing.statement.id() != statement.id() =>
            {
                tracing::debug!(
                    statement_id = %statement.id(),
                    supersedes = %existing.statement.id(),
                    "storing revision"
                );
                statement.with_supersedes(existing.statement.id())
            }
            _ => statement,
        };

        match self.store.put(&to_store) {
            Ok(()) => (to_store, Persistence::Stored),
            Err(e) => not_persisted(to_store, e),
        }
    }

    fn record(&self, record: &CycleRecord) -> bool {
        match self.store.record_cycle(record) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    statement_id = %record.statement_id,
                    error = %e,
                    "failed to record k-cycle"
                );
                false
            }
        }
    }

    pub fn lookup(&self, id: &str) -> KosResult<Option<StoredStatement>> {
        Ok(self.store.get(id)?)
    }

    /// Current statements for a subject, optionally narrowed to one relation.
    pub fn find(&self, subject_id: &str, relation: Option<&str>) -> KosResult<Vec<Statement>> {
        Ok(self
            .store
            .query(&StatementFilter::current(subject_id, relation))?
            .into_iter()
            .map(|s| s.statement)
            .collect())
    }

    /// Current and superseded statements, oldest first.
    pub fn history(
        &self,
        subject_id: &str,
        relation: Option<&str>,
    ) -> KosResult<Vec<StoredStatement>> {
        Ok(self
            .store
            .query(&StatementFilter::current(subject_id, relation).with_history())?)
    }

    /// Cycle records for a candidate id.
    pub fn audit_for(&self, statement_id: &str) -> KosResult<Vec<CycleRecord>> {
        Ok(self.store.cycles_for(statement_id)?)
    }

    pub fn stats(&self) -> KosResult<StoreStats> {
        Ok(self.store.stats()?)
    }

    /// Statements awaiting review, oldest first.
    pub fn quarantined(&self) -> Vec<QuarantinedStatement> {
        let mut held: Vec<QuarantinedStatement> =
            self.quarantine.iter().map(|e| e.value().clone()).collect();
        held.sort_by_key(|q| q.quarantined_at);
        held
    }

    /// Accept a quarantined statement after review.
    ///
    /// Structural checks run again under the acceptance lock, since the store
    /// may have changed while the statement waited. A structural failure
    /// rejects it; a storage failure leaves it in quarantine.
    pub fn promote(&self, id: &str) -> KosResult<IngestResult> {
        let (_, held) = self
            .quarantine
            .remove(id)
            .ok_or_else(|| KosError::NotQuarantined(id.to_string()))?;

        let registry = match self.registry.snapshot() {
            Ok(registry) => registry,
            Err(e) => {
                self.quarantine.insert(id.to_string(), held);
                return Err(e);
            }
        };
        let statement = held.statement.clone();
        self.with_key_lock(&statement, || self.promote_locked(id, held, &registry))
    }

    fn promote_locked(
        &self,
        id: &str,
        held: QuarantinedStatement,
        registry: &SchemaRegistry,
    ) -> KosResult<IngestResult> {
        let verdict = if self.config.switches.oos_enabled {
            match oos::validate(&held.statement, registry, self.store.as_ref()) {
                Ok(verdict) => verdict,
                Err(e) => {
                    self.quarantine.insert(id.to_string(), held);
                    return Err(e.into());
                }
            }
        } else {
            OosVerdict::Pass
        };

        let mut audit = held.audit.clone();
        let mut violations = held.violations.clone();
        let (decision, statement, confidence, persistence) = match verdict {
            OosVerdict::Pass => {
                audit.push(review_entry(Stage::Accepted, "promoted", "accepted on review"));
                let (stored, persistence) = self.persist_accepted(held.statement.clone());
                if matches!(persistence, Persistence::Failed(_)) {
                    self.quarantine.insert(id.to_string(), held.clone());
                }
                (Decision::Accepted, Some(stored), Some(held.confidence), persistence)
            }
            OosVerdict::Fail(found) => {
                let detail = crate::kcycle::violation::summarize(&found);
                audit.push(review_entry(Stage::Rejected, "structure_failed", &detail));
                violations.extend(found);
                (Decision::Rejected, None, None, Persistence::NotApplicable)
            }
        };
        tracing::info!(statement_id = %id, decision = %decision, "quarantine review");

        let record = review_record(&held, decision, confidence, &violations, &audit);
        let cycle_recorded = self.record(&record);

        Ok(IngestResult {
            decision,
            candidate_id: id.to_string(),
            statement,
            confidence,
            violations,
            audit,
            persistence,
            registry_version: registry.version(),
            cycle_recorded,
        })
    }

    /// Drop a quarantined statement, recording it as rejected.
    pub fn discard(&self, id: &str) -> KosResult<QuarantinedStatement> {
        let (_, held) = self
            .quarantine
            .remove(id)
            .ok_or_else(|| KosError::NotQuarantined(id.to_string()))?;
        let mut audit = held.audit.clone();
        audit.push(review_entry(Stage::Rejected, "discarded", "discarded on review"));
        let record = review_record(&held, Decision::Rejected, None, &held.violations, &audit);
        self.record(&record);
        tracing::info!(statement_id = %id, "quarantined statement discarded");
        Ok(held)
    }

    /// Close the underlying store. Later calls fail with a storage error.
    pub fn close(&self) -> KosResult<()> {
        Ok(self.store.close()?)
    }
}

fn not_persisted(statement: Statement, error: StorageError) -> (Statement, Persistence) {
    tracing::warn!(
        statement_id = %statement.id(),
        error = %error,
        "accepted statement was not persisted"
    );
    (statement, Persistence::Failed(error.to_string()))
}

/// Same statement content and provenance. `created` is ignored so replaying
/// a document without timestamps still collapses.
fn is_duplicate(stored: &Statement, candidate: &Statement) -> bool {
    stored.identity() == candidate.identity()
        && stored.mechanism() == candidate.mechanism()
        && same_metadata(stored.metadata(), candidate.metadata())
}

fn same_metadata(a: &Metadata, b: &Metadata) -> bool {
    a.version == b.version && a.author == b.author && a.source == b.source && a.confidence == b.confidence
}

fn review_entry(next: Stage, outcome: &str, detail: &str) -> AuditEntry {
    AuditEntry {
        stage: Stage::Quarantined,
        outcome: outcome.to_string(),
        next,
        at: Utc::now(),
        detail: detail.to_string(),
    }
}

fn review_record(
    held: &QuarantinedStatement,
    decision: Decision,
    confidence: Option<f64>,
    violations: &[Violation],
    audit: &[AuditEntry],
) -> CycleRecord {
    let s = &held.statement;
    CycleRecord {
        statement_id: s.id().to_string(),
        identity_key: s.identity_key(),
        subject_id: s.subject().id.clone(),
        relation: s.relation().to_string(),
        decision,
        confidence,
        violations: violations.to_vec(),
        audit: audit.to_vec(),
        registry_version: held.registry_version,
        recorded_at: Utc::now().to_rfc3339(),
    }
}
