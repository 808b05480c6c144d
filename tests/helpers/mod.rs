#![allow(dead_code)]

use std::sync::Arc;

use kos::engine::KnowledgeEngine;
use kos::kcycle::{CycleConfig, Switches};
use kos::ontology::{RelationSpec, SchemaRegistry, SubjectTypeSpec};
use kos::spocm::{Metadata, Object, Predicate, Statement, Subject};
use kos::storage::memory::MemoryStore;
use kos::storage::sqlite::SqliteStore;
use kos::storage::StatementStore;

/// Small ontology: people with a single role, many acquaintances, and a
/// unit-bearing weight.
pub fn test_registry() -> SchemaRegistry {
    SchemaRegistry::builder(1)
        .subject_type(SubjectTypeSpec::new("Person"))
        .subject_type(SubjectTypeSpec::new("Employee").with_parent("Person"))
        .relation(RelationSpec::new("hasRole").subjects(["Person"]).single())
        .relation(RelationSpec::new("knows").subjects(["Person"]))
        .relation(RelationSpec::new("weight").subjects(["Person"]).with_units(["kg"]))
        .build()
        .unwrap()
}

pub fn config(oos: bool, vqf: bool, strict: bool) -> CycleConfig {
    CycleConfig {
        switches: Switches {
            oos_enabled: oos,
            vqf_enabled: vqf,
            strict_mode: strict,
        },
        ..CycleConfig::default()
    }
}

pub fn engine_with(store: Arc<dyn StatementStore>, config: CycleConfig) -> KnowledgeEngine {
    KnowledgeEngine::new(store, test_registry(), config).unwrap()
}

/// Engine over a fresh in-memory store with default settings.
pub fn memory_engine() -> KnowledgeEngine {
    engine_with(Arc::new(MemoryStore::new()), CycleConfig::default())
}

/// Engine over an on-disk SQLite database at `path`.
pub fn sqlite_engine(path: &std::path::Path) -> KnowledgeEngine {
    engine_with(
        Arc::new(SqliteStore::open(path).unwrap()),
        CycleConfig::default(),
    )
}

pub fn statement(subject: &str, relation: &str, object: Object) -> Statement {
    Statement::new(
        Subject::new(subject, "Person"),
        Predicate::new(relation),
        object,
    )
}

pub fn role(value: &str) -> Statement {
    statement("user:001", "hasRole", Object::new(value))
}

pub fn with_confidence(s: Statement, confidence: f64) -> Statement {
    s.with_metadata(Metadata::default().with_confidence(confidence))
}
