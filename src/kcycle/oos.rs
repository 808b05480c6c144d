//! OOS (Ontological Output Structure) validation.
//!
//! Checks a candidate's *shape* against a registry snapshot: known names,
//! allowed subject types and object shapes, required parts and attributes.
//! The cardinality and supersession checks read existing statements from
//! storage; callers must hold the per-(subject, relation) lock while those
//! reads and the following write happen.

use crate::error::StorageError;
use crate::ontology::{Cardinality, RelationSpec, SchemaRegistry, SubPart};
use crate::spocm::Statement;
use crate::storage::{StatementFilter, StatementStore, StoredStatement};

use super::violation::{Rule, Violation};

/// Result of structural validation.
#[derive(Debug, Clone, PartialEq)]
pub enum OosVerdict {
    Pass,
    Fail(Vec<Violation>),
}

impl OosVerdict {
    fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            Self::Pass
        } else {
            Self::Fail(violations)
        }
    }
}

/// Full structural validation, including the storage-backed checks.
pub fn validate(
    candidate: &Statement,
    registry: &SchemaRegistry,
    store: &dyn StatementStore,
) -> Result<OosVerdict, StorageError> {
    let mut violations = check_shape(candidate, registry);

    let spec = registry.resolve_relation(candidate.relation());
    let single = spec.is_some_and(|s| s.cardinality == Cardinality::One);
    if single || candidate.supersedes().is_some() {
        let existing = store.query(&StatementFilter::current(
            &candidate.subject().id,
            Some(candidate.relation()),
        ))?;
        if let Some(spec) = spec {
            violations.extend(check_cardinality(candidate, spec, &existing));
        }
        if let Some(target) = candidate.supersedes() {
            violations.extend(check_identity_conflict(candidate, target, &existing));
        }
    }

    if let Some(target) = candidate.supersedes() {
        let stored = store.get(target)?;
        violations.extend(check_supersedes(target, stored.as_ref()));
    }

    Ok(OosVerdict::from_violations(violations))
}

/// Registry-only checks. Pure.
pub fn check_shape(candidate: &Statement, registry: &SchemaRegistry) -> Vec<Violation> {
    let mut violations: Vec<Violation> = candidate
        .blank_fields()
        .into_iter()
        .map(|field| Violation::new(Rule::EmptyField, field, format!("{field} must not be empty")))
        .collect();
    if !violations.is_empty() {
        return violations;
    }

    let subject = candidate.subject();
    let subject_known = registry.resolve_subject_type(&subject.subject_type).is_some();
    if subject_known {
        for key in registry.required_attributes(&subject.subject_type) {
            if !subject.attributes.contains_key(key) {
                violations.push(Violation::new(
                    Rule::MissingAttribute,
                    format!("subject.attributes.{key}"),
                    format!("subject type {} requires attribute {key}", subject.subject_type),
                ));
            }
        }
    } else {
        violations.push(Violation::new(
            Rule::UnknownSubjectType,
            "subject.type",
            format!("subject type {} is not in schema v{}", subject.subject_type, registry.version()),
        ));
    }

    let Some(spec) = registry.resolve_relation(candidate.relation()) else {
        violations.push(Violation::new(
            Rule::UnknownRelation,
            "predicate.relation",
            format!("relation {} is not in schema v{}", candidate.relation(), registry.version()),
        ));
        return violations;
    };

    if subject_known
        && !spec.subject_types.is_empty()
        && !spec
            .subject_types
            .iter()
            .any(|allowed| registry.is_a(&subject.subject_type, allowed))
    {
        violations.push(Violation::new(
            Rule::SubjectTypeNotAllowed,
            "subject.type",
            format!(
                "relation {} does not accept subject type {} (allowed: {})",
                spec.name,
                subject.subject_type,
                spec.subject_types.join(", ")
            ),
        ));
    }

    let value = &candidate.object().value;
    if !spec.object_shapes.is_empty() && !spec.object_shapes.iter().any(|s| s.admits(value)) {
        let allowed: Vec<&str> = spec.object_shapes.iter().map(|s| s.as_str()).collect();
        violations.push(Violation::new(
            Rule::ObjectShapeNotAllowed,
            "object.value",
            format!(
                "relation {} accepts objects of shape {}",
                spec.name,
                allowed.join(", ")
            ),
        ));
    }

    for part in &spec.requires {
        let present = match part {
            SubPart::Context => candidate.context().is_some(),
            SubPart::Mechanism => candidate.mechanism().is_some(),
            SubPart::Temporality => candidate.predicate().temporality.is_some(),
        };
        if !present {
            violations.push(Violation::new(
                Rule::MissingSubPart,
                part.as_str(),
                format!("relation {} requires {}", spec.name, part.as_str()),
            ));
        }
    }

    violations
}

/// Single-cardinality relations admit one current fact per subject.
///
/// Statements with the same identity as the candidate are earlier revisions of
/// it, and the statement the candidate supersedes is being replaced, so
/// neither counts as a conflict.
pub fn check_cardinality(
    candidate: &Statement,
    spec: &RelationSpec,
    existing: &[StoredStatement],
) -> Option<Violation> {
    if spec.cardinality != Cardinality::One {
        return None;
    }
    let key = candidate.identity_key();
    let conflicts: Vec<&str> = existing
        .iter()
        .filter(|s| s.superseded_by.is_none())
        .filter(|s| Some(s.statement.id()) != candidate.supersedes())
        .filter(|s| s.statement.identity_key() != key)
        .map(|s| s.statement.id())
        .collect();
    if conflicts.is_empty() {
        return None;
    }
    Some(Violation::new(
        Rule::CardinalityExceeded,
        "predicate.relation",
        format!(
            "{} already has a current {} statement ({}); supersede it instead",
            candidate.subject().id,
            spec.name,
            conflicts.join(", ")
        ),
    ))
}

/// A candidate that supersedes `target` must not leave another current
/// statement with its own identity behind.
pub fn check_identity_conflict(
    candidate: &Statement,
    target: &str,
    existing: &[StoredStatement],
) -> Option<Violation> {
    let key = candidate.identity_key();
    let other = existing.iter().find(|s| {
        s.superseded_by.is_none()
            && s.statement.id() != target
            && s.statement.id() != candidate.id()
            && s.statement.identity_key() == key
    })?;
    Some(Violation::new(
        Rule::IdentityConflict,
        "supersedes",
        format!(
            "statement {} with the same identity is current; supersede it instead of {target}",
            other.statement.id()
        ),
    ))
}

/// A supersedes link must point at a stored, still-current statement.
pub fn check_supersedes(target: &str, stored: Option<&StoredStatement>) -> Option<Violation> {
    match stored {
        None => Some(Violation::new(
            Rule::SupersedesUnknown,
            "supersedes",
            format!("supersedes target not found: {target}"),
        )),
        Some(s) => s.superseded_by.as_ref().map(|by| {
            Violation::new(
                Rule::SupersedesUnknown,
                "supersedes",
                format!("statement {target} was already superseded by {by}"),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::{ObjectShape, RelationSpec, SubjectTypeSpec};
    use crate::spocm::{Object, ObjectValue, Predicate, Subject};
    use crate::storage::memory::MemoryStore;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builder(7)
            .subject_type(SubjectTypeSpec::new("Person"))
            .subject_type(SubjectTypeSpec::new("Employee").with_parent("Person"))
            .subject_type(SubjectTypeSpec::new("Device").with_required_attribute("serial"))
            .relation(RelationSpec::new("hasRole").subjects(["Person"]).single())
            .relation(
                RelationSpec::new("worksFor")
                    .subjects(["Person"])
                    .objects([ObjectShape::Reference])
                    .requiring(SubPart::Context),
            )
            .relation(RelationSpec::new("owns"))
            .build()
            .unwrap()
    }

    fn statement(subject_type: &str, relation: &str, object: impl Into<ObjectValue>) -> Statement {
        Statement::new(
            Subject::new("user:001", subject_type),
            Predicate::new(relation),
            Object::new(object),
        )
    }

    fn rules(v: &[Violation]) -> Vec<Rule> {
        v.iter().map(|v| v.rule).collect()
    }

    #[test]
    fn valid_statement_has_no_violations() {
        let s = statement("Person", "hasRole", "Administrator");
        assert!(check_shape(&s, &registry()).is_empty());
    }

    #[test]
    fn unknown_relation_is_reported() {
        let s = statement("Person", "hasPet", "Rex");
        let v = check_shape(&s, &registry());
        assert_eq!(rules(&v), vec![Rule::UnknownRelation]);
        assert!(v[0].message.contains("schema v7"));
    }

    #[test]
    fn unknown_subject_type_is_reported() {
        let s = statement("Robot", "owns", "a thing");
        assert_eq!(rules(&check_shape(&s, &registry())), vec![Rule::UnknownSubjectType]);
    }

    #[test]
    fn blank_fields_short_circuit() {
        let s = statement("", "", "x");
        let v = check_shape(&s, &registry());
        assert_eq!(rules(&v), vec![Rule::EmptyField, Rule::EmptyField]);
    }

    #[test]
    fn subtypes_are_admitted() {
        let s = statement("Employee", "hasRole", "Engineer");
        assert!(check_shape(&s, &registry()).is_empty());
        let s = statement("Device", "hasRole", "Router");
        let v = check_shape(&s, &registry());
        assert!(rules(&v).contains(&Rule::SubjectTypeNotAllowed));
        assert!(rules(&v).contains(&Rule::MissingAttribute));
    }

    #[test]
    fn object_shape_and_sub_parts() {
        let s = statement("Person", "worksFor", "Acme");
        assert_eq!(
            rules(&check_shape(&s, &registry())),
            vec![Rule::ObjectShapeNotAllowed, Rule::MissingSubPart]
        );
        let s = statement("Person", "worksFor", ObjectValue::reference("org:acme"))
            .with_context(crate::spocm::Context::domain("hr"));
        assert!(check_shape(&s, &registry()).is_empty());
    }

    #[test]
    fn cardinality_ignores_revisions_and_superseded_target() {
        let store = MemoryStore::new();
        let first = statement("Person", "hasRole", "Administrator");
        store.put(&first).unwrap();

        let reg = registry();
        let spec = reg.resolve_relation("hasRole").unwrap();
        let existing = store
            .query(&StatementFilter::current("user:001", Some("hasRole")))
            .unwrap();

        let revision = statement("Person", "hasRole", "Administrator");
        assert!(check_cardinality(&revision, spec, &existing).is_none());

        let other = statement("Person", "hasRole", "Viewer");
        let v = check_cardinality(&other, spec, &existing).unwrap();
        assert_eq!(v.rule, Rule::CardinalityExceeded);
        assert!(v.message.contains(first.id()));

        let replacement = statement("Person", "hasRole", "Viewer").with_supersedes(first.id());
        assert!(check_cardinality(&replacement, spec, &existing).is_none());
    }

    #[test]
    fn validate_checks_supersedes_target() {
        let store = MemoryStore::new();
        let s = statement("Person", "owns", "bike").with_supersedes("missing-id");
        let OosVerdict::Fail(v) = validate(&s, &registry(), &store).unwrap() else {
            panic!("expected failure");
        };
        assert_eq!(rules(&v), vec![Rule::SupersedesUnknown]);
    }

    #[test]
    fn superseding_another_statement_cannot_leave_an_identity_twin() {
        let store = MemoryStore::new();
        let bike = statement("Person", "owns", "bike");
        let car = statement("Person", "owns", "car");
        store.put(&bike).unwrap();
        store.put(&car).unwrap();

        let twin = statement("Person", "owns", "bike").with_supersedes(car.id());
        let OosVerdict::Fail(v) = validate(&twin, &registry(), &store).unwrap() else {
            panic!("expected failure");
        };
        assert_eq!(rules(&v), vec![Rule::IdentityConflict]);
        assert!(v[0].message.contains(bike.id()));

        let revision = statement("Person", "owns", "bike").with_supersedes(bike.id());
        assert_eq!(validate(&revision, &registry(), &store).unwrap(), OosVerdict::Pass);
    }
}
