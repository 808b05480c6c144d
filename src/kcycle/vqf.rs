//! VQF (Value/Quality Framework) validation.
//!
//! Checks a structurally valid candidate's *content*: units, temporal order,
//! value plausibility, declared types, confidence bounds and provenance. Every
//! finding carries a confidence adjustment; under strict mode the orchestrator
//! turns any finding into a rejection instead.

use serde::{Deserialize, Serialize};

use crate::ontology::RelationSpec;
use crate::spocm::{ObjectValue, ProcedureStep, Statement, Value};

use super::violation::{Rule, Violation};

/// Confidence bonus when both author and source are present.
pub const PROVENANCE_BONUS: f64 = 0.05;

/// Confidence adjustment applied for each quality rule that fires.
pub fn penalty(rule: Rule) -> f64 {
    match rule {
        Rule::MissingUnit | Rule::UnitNotAllowed => -0.2,
        Rule::UnexpectedUnit => -0.1,
        Rule::TemporalOrder | Rule::ValueOutOfRange => -0.3,
        Rule::DeclaredTypeMismatch => -0.1,
        Rule::ConfidenceOutOfBounds => -0.2,
        Rule::MissingProvenance => -0.1,
        Rule::EmptyProcedureStep => -0.05,
        _ => 0.0,
    }
}

/// One signed contribution to the final confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub reason: String,
    pub delta: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VqfReport {
    pub violations: Vec<Violation>,
    pub adjustments: Vec<Adjustment>,
}

impl VqfReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Net quality adjustment, bounded to [-1.0, 1.0].
    pub fn adjustment(&self) -> f64 {
        self.adjustments
            .iter()
            .map(|a| a.delta)
            .sum::<f64>()
            .clamp(-1.0, 1.0)
    }

    fn flag(&mut self, rule: Rule, field: &str, message: String) {
        self.adjustments.push(Adjustment {
            reason: format!("{field}: {rule}"),
            delta: penalty(rule),
        });
        self.violations.push(Violation::new(rule, field, message));
    }
}

/// Run the quality checks.
///
/// `spec` is `None` when structural validation was skipped and the relation
/// did not resolve; relation-specific checks are then skipped as well.
pub fn validate(candidate: &Statement, spec: Option<&RelationSpec>, strict_mode: bool) -> VqfReport {
    let mut report = VqfReport::default();

    if let Some(spec) = spec {
        check_unit(candidate, spec, &mut report);
        check_range(candidate, spec, &mut report);
    }
    check_temporality(candidate, &mut report);
    check_declared_type(candidate, &mut report);
    check_confidence(candidate, &mut report);
    check_provenance(
        candidate,
        strict_mode || spec.is_some_and(|s| s.requires_provenance),
        &mut report,
    );
    check_procedure(candidate, &mut report);

    report
}

fn check_unit(candidate: &Statement, spec: &RelationSpec, report: &mut VqfReport) {
    match (&candidate.object().unit, spec.unit_bearing) {
        (None, true) => report.flag(
            Rule::MissingUnit,
            "object.unit",
            format!("relation {} is unit-bearing but no unit was given", spec.name),
        ),
        (Some(unit), false) => report.flag(
            Rule::UnexpectedUnit,
            "object.unit",
            format!("relation {} takes no unit, got {unit}", spec.name),
        ),
        (Some(unit), true) if !spec.units.is_empty() && !spec.units.contains(unit) => report.flag(
            Rule::UnitNotAllowed,
            "object.unit",
            format!(
                "unit {unit} is not one of {} for relation {}",
                spec.units.join(", "),
                spec.name
            ),
        ),
        _ => {}
    }
}

fn check_range(candidate: &Statement, spec: &RelationSpec, report: &mut VqfReport) {
    let Some(n) = candidate.object().value.literal().and_then(Value::as_number) else {
        return;
    };
    if !n.is_finite() {
        report.flag(
            Rule::ValueOutOfRange,
            "object.value",
            format!("{n} is not a finite number"),
        );
        return;
    }
    if let Some(range) = spec.range {
        if !range.contains(n) {
            report.flag(
                Rule::ValueOutOfRange,
                "object.value",
                format!(
                    "{n} is outside the plausible range [{}, {}] for {}",
                    range.min, range.max, spec.name
                ),
            );
        }
    }
}

/// Interval order is a property of the statement within its own context.
fn check_temporality(candidate: &Statement, report: &mut VqfReport) {
    let Some((start, end)) = candidate
        .predicate()
        .temporality
        .as_ref()
        .and_then(|t| t.bounds())
    else {
        return;
    };
    if start > end {
        let scope = candidate
            .context()
            .and_then(|c| c.domain.as_deref())
            .unwrap_or("default context");
        report.flag(
            Rule::TemporalOrder,
            "predicate.temporality",
            format!(
                "interval starts at {} after it ends at {} ({scope})",
                start.to_rfc3339(),
                end.to_rfc3339()
            ),
        );
    }
}

fn check_declared_type(candidate: &Statement, report: &mut VqfReport) {
    let object = candidate.object();
    let Some(declared) = object.declared_type.as_deref() else {
        return;
    };
    let consistent = match (declared.to_ascii_lowercase().as_str(), &object.value) {
        ("reference" | "ref", v) => matches!(v, ObjectValue::Reference { .. }),
        (_, ObjectValue::Reference { .. }) => true,
        ("text" | "string", ObjectValue::Literal(v)) => matches!(v, Value::Text(_)),
        ("number" | "float" | "integer", ObjectValue::Literal(v)) => matches!(v, Value::Number(_)),
        ("boolean" | "bool", ObjectValue::Literal(v)) => matches!(v, Value::Bool(_)),
        ("list", ObjectValue::Literal(v)) => matches!(v, Value::List(_)),
        ("map" | "object", ObjectValue::Literal(v)) => matches!(v, Value::Map(_)),
        // Domain type names (e.g. "Role") are not checked here.
        _ => true,
    };
    if !consistent {
        let actual = match &object.value {
            ObjectValue::Reference { .. } => "reference",
            ObjectValue::Literal(v) => v.kind(),
        };
        report.flag(
            Rule::DeclaredTypeMismatch,
            "object.type",
            format!("declared type {declared} but value is {actual}"),
        );
    }
}

fn check_confidence(candidate: &Statement, report: &mut VqfReport) {
    if let Some(c) = candidate.metadata().confidence {
        if !(0.0..=1.0).contains(&c) {
            report.flag(
                Rule::ConfidenceOutOfBounds,
                "metadata.confidence",
                format!("confidence {c} is outside [0.0, 1.0]"),
            );
        }
    }
}

fn check_provenance(candidate: &Statement, required: bool, report: &mut VqfReport) {
    let meta = candidate.metadata();
    if meta.has_provenance() {
        report.adjustments.push(Adjustment {
            reason: "metadata: author and source present".into(),
            delta: PROVENANCE_BONUS,
        });
        return;
    }
    if !required {
        return;
    }
    let mut missing = Vec::new();
    if !meta.author.as_deref().is_some_and(|a| !a.trim().is_empty()) {
        missing.push("author");
    }
    if !meta.source.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        missing.push("source");
    }
    report.flag(
        Rule::MissingProvenance,
        "metadata",
        format!("missing {}", missing.join(" and ")),
    );
}

fn check_procedure(candidate: &Statement, report: &mut VqfReport) {
    let Some(mechanism) = candidate.mechanism() else {
        return;
    };
    for (i, step) in mechanism.procedure.iter().enumerate() {
        let text = match step {
            ProcedureStep::Statement(id) => id,
            ProcedureStep::Description(d) => d,
        };
        if text.trim().is_empty() {
            report.flag(
                Rule::EmptyProcedureStep,
                &format!("mechanism.procedure[{i}]"),
                "procedure step is empty".into(),
            );
        }
    }
}
