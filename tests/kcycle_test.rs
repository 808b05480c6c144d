mod helpers;

use std::sync::Arc;

use helpers::{config, engine_with, memory_engine, role, statement, with_confidence};
use kos::engine::Persistence;
use kos::kcycle::{Decision, Rule, Stage, ViolationClass};
use kos::spocm::Object;
use kos::storage::memory::MemoryStore;

fn weight(value: f64) -> kos::spocm::Statement {
    statement("user:001", "weight", Object::new(value))
}

#[test]
fn role_scenario_accepts_then_rejects_second_role() {
    let engine = memory_engine();

    let first = engine.ingest(role("Administrator")).unwrap();
    assert_eq!(first.decision, Decision::Accepted);
    assert_eq!(first.confidence, Some(0.5));
    assert!(first.violations.is_empty());
    assert_eq!(first.persistence, Persistence::Stored);

    let stages: Vec<Stage> = first.audit.iter().map(|e| e.next).collect();
    assert_eq!(
        stages,
        vec![
            Stage::OosCheck,
            Stage::VqfCheck,
            Stage::ConfidenceResolution,
            Stage::Accepted
        ]
    );

    let second = engine.ingest(role("Viewer")).unwrap();
    assert_eq!(second.decision, Decision::Rejected);
    assert!(second
        .violations
        .iter()
        .any(|v| v.rule == Rule::CardinalityExceeded));
    assert_eq!(second.audit.last().unwrap().next, Stage::Rejected);

    let current = engine.find("user:001", Some("hasRole")).unwrap();
    assert_eq!(current.len(), 1);
}

#[test]
fn unknown_relation_is_rejected_in_any_mode() {
    for strict in [false, true] {
        let engine = engine_with(Arc::new(MemoryStore::new()), config(true, true, strict));
        let result = engine
            .ingest(statement("user:001", "hasPet", Object::new("cat")))
            .unwrap();
        assert_eq!(result.decision, Decision::Rejected, "strict={strict}");
        let v = &result.violations[0];
        assert_eq!(v.rule, Rule::UnknownRelation);
        assert_eq!(v.class, ViolationClass::UnknownSchemaReference);
        assert!(result.confidence.is_none());
    }
}

#[test]
fn threshold_is_inclusive_for_acceptance() {
    let engine = memory_engine();

    // unit-bearing relation without a unit: -0.2
    let at = engine.ingest(weight(72.0)).unwrap();
    assert_eq!(at.decision, Decision::Accepted);
    assert_eq!(at.confidence, Some(0.3));

    let below = engine.ingest(with_confidence(weight(73.0), 0.49)).unwrap();
    assert_eq!(below.decision, Decision::Quarantined);
    assert!(below.confidence.unwrap() < 0.3);
    assert_eq!(engine.quarantined().len(), 1);
}

#[test]
fn strict_mode_rejects_quality_violations() {
    let engine = engine_with(Arc::new(MemoryStore::new()), config(true, true, true));
    let result = engine
        .ingest(weight(72.0).with_metadata(
            kos::spocm::Metadata::default()
                .with_author("lab")
                .with_source("scale"),
        ))
        .unwrap();
    assert_eq!(result.decision, Decision::Rejected);
    assert!(result.violations.iter().any(|v| v.rule == Rule::MissingUnit));
    assert_eq!(result.audit.last().unwrap().stage, Stage::VqfCheck);
}

#[test]
fn strict_mode_accepts_clean_low_confidence_statement() {
    let engine = engine_with(Arc::new(MemoryStore::new()), config(true, true, true));
    let result = engine
        .ingest(statement("user:001", "knows", Object::new("user:002")).with_metadata(
            kos::spocm::Metadata::default()
                .with_author("hr")
                .with_source("directory")
                .with_confidence(0.2),
        ))
        .unwrap();
    assert_eq!(result.decision, Decision::Accepted);
    assert!(result.violations.is_empty());
    assert_eq!(result.confidence, Some(0.25));
    assert!(engine.quarantined().is_empty());
}

#[test]
fn threshold_holds_after_summed_penalties() {
    let engine = memory_engine();
    let predicate = kos::spocm::Predicate::new("knows").with_temporality(
        kos::spocm::Temporality::interval(
            Some("2024-06-01T00:00:00Z".parse().unwrap()),
            Some("2024-01-01T00:00:00Z".parse().unwrap()),
        ),
    );
    let s = kos::spocm::Statement::new(
        kos::spocm::Subject::new("user:001", "Person"),
        predicate,
        Object::new("user:002").with_unit("kg"),
    );
    let result = engine.ingest(with_confidence(s, 0.7)).unwrap();
    assert_eq!(result.violations.len(), 2);
    assert_eq!(result.decision, Decision::Accepted);
    assert_eq!(result.confidence, Some(0.3));
}

#[test]
fn disabling_vqf_ignores_quality_problems() {
    let engine = engine_with(Arc::new(MemoryStore::new()), config(true, false, true));
    let result = engine.ingest(weight(72.0)).unwrap();
    assert_eq!(result.decision, Decision::Accepted);
    assert_eq!(result.confidence, Some(0.5));
    assert!(result.audit.iter().all(|e| e.stage != Stage::VqfCheck));
}

#[test]
fn disabling_vqf_keeps_structural_rejections() {
    let engine = engine_with(Arc::new(MemoryStore::new()), config(true, false, true));
    let result = engine
        .ingest(statement("user:001", "hasPet", Object::new("cat")))
        .unwrap();
    assert_eq!(result.decision, Decision::Rejected);
}

#[test]
fn confidence_is_always_within_unit_interval() {
    let engine = memory_engine();
    for prior in [-3.0, 0.0, 0.31, 0.9, 1.0, 7.5] {
        let result = engine
            .ingest(with_confidence(
                statement("user:001", "knows", Object::new(format!("user:{prior}"))),
                prior,
            ))
            .unwrap();
        if let Some(c) = result.confidence {
            assert!((0.0..=1.0).contains(&c), "prior {prior} gave {c}");
        }
    }
}

#[test]
fn every_decision_has_an_audit_trail() {
    let engine = memory_engine();
    let results = [
        engine.ingest(role("Administrator")).unwrap(),
        engine.ingest(role("Viewer")).unwrap(),
        engine.ingest(with_confidence(weight(70.0), 0.1)).unwrap(),
    ];
    for r in &results {
        assert!(!r.audit.is_empty());
        assert_eq!(r.audit[0].stage, Stage::Received);
        assert!(r.cycle_recorded);
        assert_eq!(engine.audit_for(&r.candidate_id).unwrap().len(), 1);
    }
    let stats = engine.stats().unwrap();
    assert_eq!(stats.cycles_by_decision["accepted"], 1);
    assert_eq!(stats.cycles_by_decision["rejected"], 1);
    assert_eq!(stats.cycles_by_decision["quarantined"], 1);
}
