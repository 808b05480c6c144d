//! Structured rule violations reported by the validators.

use serde::{Deserialize, Serialize};

/// How a violation is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationClass {
    /// A name that does not resolve in the schema registry. Always structural.
    UnknownSchemaReference,
    Structural,
    Quality,
}

impl ViolationClass {
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Quality)
    }
}

/// The rule a statement broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    // structural (OOS)
    UnknownRelation,
    UnknownSubjectType,
    EmptyField,
    SubjectTypeNotAllowed,
    ObjectShapeNotAllowed,
    MissingSubPart,
    MissingAttribute,
    CardinalityExceeded,
    SupersedesUnknown,
    IdentityConflict,
    // quality (VQF)
    MissingUnit,
    UnexpectedUnit,
    UnitNotAllowed,
    TemporalOrder,
    ValueOutOfRange,
    DeclaredTypeMismatch,
    ConfidenceOutOfBounds,
    MissingProvenance,
    EmptyProcedureStep,
}

impl Rule {
    pub fn class(&self) -> ViolationClass {
        match self {
            Self::UnknownRelation | Self::UnknownSubjectType => {
                ViolationClass::UnknownSchemaReference
            }
            Self::EmptyField
            | Self::SubjectTypeNotAllowed
            | Self::ObjectShapeNotAllowed
            | Self::MissingSubPart
            | Self::MissingAttribute
            | Self::CardinalityExceeded
            | Self::SupersedesUnknown
            | Self::IdentityConflict => ViolationClass::Structural,
            _ => ViolationClass::Quality,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownRelation => "unknown_relation",
            Self::UnknownSubjectType => "unknown_subject_type",
            Self::EmptyField => "empty_field",
            Self::SubjectTypeNotAllowed => "subject_type_not_allowed",
            Self::ObjectShapeNotAllowed => "object_shape_not_allowed",
            Self::MissingSubPart => "missing_sub_part",
            Self::MissingAttribute => "missing_attribute",
            Self::CardinalityExceeded => "cardinality_exceeded",
            Self::SupersedesUnknown => "supersedes_unknown",
            Self::IdentityConflict => "identity_conflict",
            Self::MissingUnit => "missing_unit",
            Self::UnexpectedUnit => "unexpected_unit",
            Self::UnitNotAllowed => "unit_not_allowed",
            Self::TemporalOrder => "temporal_order",
            Self::ValueOutOfRange => "value_out_of_range",
            Self::DeclaredTypeMismatch => "declared_type_mismatch",
            Self::ConfidenceOutOfBounds => "confidence_out_of_bounds",
            Self::MissingProvenance => "missing_provenance",
            Self::EmptyProcedureStep => "empty_procedure_step",
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One broken rule: which field, which rule, and a readable explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: Rule,
    pub class: ViolationClass,
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(rule: Rule, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule,
            class: rule.class(),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.field, self.rule, self.message)
    }
}

/// Joins violations into one audit detail line.
pub fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
