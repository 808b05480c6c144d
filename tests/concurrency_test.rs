mod helpers;

use std::sync::Arc;

use helpers::{config, engine_with, memory_engine, role, sqlite_engine, statement};
use kos::kcycle::{Decision, Rule};
use kos::spocm::{Object, ObjectValue};
use kos::storage::memory::MemoryStore;

fn race_for_single_role(engine: &kos::engine::KnowledgeEngine, n: usize) {
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..n)
            .map(|i| s.spawn(move || engine.ingest(role(&format!("Role{i}"))).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let accepted = results
        .iter()
        .filter(|r| r.decision == Decision::Accepted)
        .count();
    assert_eq!(accepted, 1);
    for r in results.iter().filter(|r| r.decision != Decision::Accepted) {
        assert_eq!(r.decision, Decision::Rejected);
        assert!(r.violations.iter().any(|v| v.rule == Rule::CardinalityExceeded));
    }
    assert_eq!(engine.find("user:001", Some("hasRole")).unwrap().len(), 1);
}

#[test]
fn concurrent_single_cardinality_accepts_exactly_one() {
    let engine = memory_engine();
    race_for_single_role(&engine, 16);
}

#[test]
fn concurrent_single_cardinality_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let engine = sqlite_engine(&dir.path().join("kos.db"));
    race_for_single_role(&engine, 8);
}

#[test]
fn many_cardinality_accepts_all_in_parallel() {
    let engine = engine_with(Arc::new(MemoryStore::new()), config(true, true, false));
    std::thread::scope(|s| {
        for i in 0..8 {
            let engine = &engine;
            s.spawn(move || {
                let result = engine
                    .ingest(statement(
                        "user:001",
                        "knows",
                        Object::new(ObjectValue::reference(format!("user:{i:03}"))),
                    ))
                    .unwrap();
                assert_eq!(result.decision, Decision::Accepted);
            });
        }
    });
    assert_eq!(engine.find("user:001", Some("knows")).unwrap().len(), 8);
}
