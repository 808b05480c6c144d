mod helpers;

use helpers::{role, sqlite_engine, statement, with_confidence};
use kos::kcycle::Decision;
use kos::spocm::{Context, Mechanism, Metadata, Object, ProcedureStep, Temporality, Value};

#[test]
fn accepted_statements_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kos.db");

    let rich = statement("user:001", "weight", Object::new(72.5).with_unit("kg"))
        .with_context(Context::domain("health"))
        .with_mechanism(Mechanism {
            kind: Some("measurement".into()),
            procedure: vec![ProcedureStep::Description("step on scale".into())],
            causality: None,
        })
        .with_metadata(
            Metadata::default()
                .with_author("nurse")
                .with_source("clinic")
                .with_confidence(0.7),
        );

    let (role_id, weight_id) = {
        let engine = sqlite_engine(&path);
        let a = engine.ingest(role("Administrator")).unwrap();
        let w = engine.ingest(rich.clone()).unwrap();
        assert_eq!(a.decision, Decision::Accepted);
        assert_eq!(w.decision, Decision::Accepted);
        engine.close().unwrap();
        (a.candidate_id, w.candidate_id)
    };

    let engine = sqlite_engine(&path);
    let stored = engine.lookup(&weight_id).unwrap().unwrap();
    assert_eq!(stored.statement.object(), rich.object());
    assert_eq!(stored.statement.context(), rich.context());
    assert_eq!(stored.statement.mechanism(), rich.mechanism());
    // 0.7 prior + provenance bonus
    assert!((stored.statement.metadata().confidence.unwrap() - 0.75).abs() < 1e-9);

    assert!(engine.lookup(&role_id).unwrap().is_some());
    let cycles = engine.audit_for(&role_id).unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].decision, Decision::Accepted);

    // cardinality still enforced against persisted state
    let second = engine.ingest(role("Viewer")).unwrap();
    assert_eq!(second.decision, Decision::Rejected);
}

#[test]
fn rejected_candidates_are_explainable_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kos.db");

    let candidate = with_confidence(statement("user:001", "hasPet", Object::new("cat")), 0.9);
    let id = candidate.id().to_string();
    {
        let engine = sqlite_engine(&path);
        assert_eq!(engine.ingest(candidate).unwrap().decision, Decision::Rejected);
    }

    let engine = sqlite_engine(&path);
    assert!(engine.lookup(&id).unwrap().is_none());
    let cycles = engine.audit_for(&id).unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].decision, Decision::Rejected);
    assert!(!cycles[0].violations.is_empty());
    assert!(!cycles[0].audit.is_empty());
}

#[test]
fn temporality_and_structured_values_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let engine = sqlite_engine(&dir.path().join("kos.db"));

    let predicate = kos::spocm::Predicate::new("knows").with_temporality(Temporality::interval(
        Some("2020-01-01T00:00:00Z".parse().unwrap()),
        None,
    ));
    let s = kos::spocm::Statement::new(
        kos::spocm::Subject::new("user:001", "Person"),
        predicate,
        Object::new(Value::List(vec![Value::from("a"), Value::from(1.0)])),
    );
    let result = engine.ingest(s.clone()).unwrap();
    assert_eq!(result.decision, Decision::Accepted);
    let stored = engine.lookup(s.id()).unwrap().unwrap();
    assert_eq!(stored.statement.predicate(), s.predicate());
    assert_eq!(stored.statement.object(), s.object());
}
