//! The five SPOC-M parts plus statement metadata.
//!
//! Defines [`Subject`], [`Predicate`], [`Object`], [`Context`], [`Mechanism`]
//! and [`Metadata`]. These are plain values; validation against the ontology
//! happens in [`kcycle`](crate::kcycle).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Value;

/// Metadata version stamped on statements that do not carry one.
pub const DEFAULT_METADATA_VERSION: &str = "2.5";

/// The entity a statement is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Identifier, unique within the subject type's namespace (e.g. `"user:001"`).
    pub id: String,
    /// Type tag resolved against the ontology (e.g. `"Person"`).
    #[serde(rename = "type")]
    pub subject_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl Subject {
    pub fn new(id: impl Into<String>, subject_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject_type: subject_type.into(),
            label: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// How strongly the statement is asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Asserted,
    Hypothetical,
    Negated,
    Possible,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asserted => "asserted",
            Self::Hypothetical => "hypothetical",
            Self::Negated => "negated",
            Self::Possible => "possible",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asserted" => Ok(Self::Asserted),
            "hypothetical" => Ok(Self::Hypothetical),
            "negated" => Ok(Self::Negated),
            "possible" => Ok(Self::Possible),
            _ => Err(format!("unknown modality: {s}")),
        }
    }
}

/// When the statement holds: a single instant or a (possibly open) interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Temporality {
    Instant {
        at: DateTime<Utc>,
    },
    Interval {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<DateTime<Utc>>,
    },
}

impl Temporality {
    pub fn interval(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self::Interval { start, end }
    }

    /// Both bounds, when the interval is closed on both sides.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            Self::Interval {
                start: Some(start),
                end: Some(end),
            } => Some((*start, *end)),
            _ => None,
        }
    }
}

/// The relation connecting subject to object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub relation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<Modality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporality: Option<Temporality>,
}

impl Predicate {
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            modality: None,
            temporality: None,
        }
    }

    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = Some(modality);
        self
    }

    pub fn with_temporality(mut self, temporality: Temporality) -> Self {
        self.temporality = Some(temporality);
        self
    }
}

/// An object is either a literal value or a reference to another identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectValue {
    Reference {
        #[serde(rename = "ref")]
        target: String,
    },
    Literal(Value),
}

impl ObjectValue {
    pub fn reference(target: impl Into<String>) -> Self {
        Self::Reference {
            target: target.into(),
        }
    }

    pub fn literal(&self) -> Option<&Value> {
        match self {
            Self::Literal(v) => Some(v),
            Self::Reference { .. } => None,
        }
    }
}

impl From<Value> for ObjectValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for ObjectValue {
    fn from(s: &str) -> Self {
        Self::Literal(Value::from(s))
    }
}

impl From<String> for ObjectValue {
    fn from(s: String) -> Self {
        Self::Literal(Value::from(s))
    }
}

impl From<f64> for ObjectValue {
    fn from(n: f64) -> Self {
        Self::Literal(Value::Number(n))
    }
}

impl From<bool> for ObjectValue {
    fn from(b: bool) -> Self {
        Self::Literal(Value::Bool(b))
    }
}

/// What the subject is related to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub value: ObjectValue,
    /// Declared value type (e.g. `"number"`), checked against the literal's shape.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Object {
    pub fn new(value: impl Into<ObjectValue>) -> Self {
        Self {
            value: value.into(),
            declared_type: None,
            unit: None,
        }
    }

    pub fn with_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Disambiguating scope for a statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perspective: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, Value>,
}

impl Context {
    pub fn domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            ..Self::default()
        }
    }
}

/// One step of a mechanism's procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureStep {
    /// Reference to another statement by id.
    Statement(String),
    Description(String),
}

/// Explanatory structure: how or why the statement holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mechanism {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub procedure: Vec<ProcedureStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causality: Option<String>,
}

/// Provenance and confidence for a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Prior confidence on input; the resolved confidence once accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn default_version() -> String {
    DEFAULT_METADATA_VERSION.to_string()
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            version: default_version(),
            created: Utc::now(),
            author: None,
            confidence: None,
            source: None,
        }
    }
}

impl Metadata {
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn has_provenance(&self) -> bool {
        non_blank(self.author.as_deref()) && non_blank(self.source.as_deref())
    }
}

fn non_blank(s: Option<&str>) -> bool {
    s.is_some_and(|s| !s.trim().is_empty())
}
