//! Ontological schema registry: known subject types, relations, and their constraints.
//!
//! A [`SchemaRegistry`] is immutable once built. [`RegistryHandle`] holds the
//! current version behind an `Arc` so a running K-Cycle keeps validating
//! against the snapshot it started with while a new version is swapped in.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{KosError, SchemaError};
use crate::spocm::{ObjectValue, Value};

/// Whether a subject may hold one or many current statements for a relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    One,
    #[default]
    Many,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::One => "one",
            Self::Many => "many",
        }
    }
}

/// Accepted shapes for a relation's object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectShape {
    Any,
    Text,
    Number,
    Boolean,
    Reference,
    Structured,
}

impl ObjectShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Reference => "reference",
            Self::Structured => "structured",
        }
    }

    pub fn admits(&self, value: &ObjectValue) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (Self::Reference, ObjectValue::Reference { .. }) => true,
            (Self::Text, ObjectValue::Literal(Value::Text(_))) => true,
            (Self::Number, ObjectValue::Literal(Value::Number(_))) => true,
            (Self::Boolean, ObjectValue::Literal(Value::Bool(_))) => true,
            (Self::Structured, ObjectValue::Literal(Value::List(_) | Value::Map(_))) => true,
            _ => false,
        }
    }
}

/// Optional statement parts a relation may demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubPart {
    Context,
    Mechanism,
    Temporality,
}

impl SubPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Mechanism => "mechanism",
            Self::Temporality => "predicate.temporality",
        }
    }
}

/// Inclusive numeric plausibility range for literal objects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn contains(&self, n: f64) -> bool {
        n >= self.min && n <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationSpec {
    pub name: String,
    /// Allowed subject types. Empty admits any registered type.
    #[serde(default)]
    pub subject_types: Vec<String>,
    /// Allowed object shapes. Empty admits any shape.
    #[serde(default)]
    pub object_shapes: Vec<ObjectShape>,
    #[serde(default)]
    pub unit_bearing: bool,
    /// Units accepted when `unit_bearing`. Empty admits any unit.
    #[serde(default)]
    pub units: Vec<String>,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub requires: Vec<SubPart>,
    #[serde(default)]
    pub range: Option<ValueRange>,
    /// Missing author/source degrades confidence even outside strict mode.
    #[serde(default)]
    pub requires_provenance: bool,
}

impl RelationSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subject_types: Vec::new(),
            object_shapes: Vec::new(),
            unit_bearing: false,
            units: Vec::new(),
            cardinality: Cardinality::Many,
            requires: Vec::new(),
            range: None,
            requires_provenance: false,
        }
    }

    pub fn subjects<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subject_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn objects(mut self, shapes: impl IntoIterator<Item = ObjectShape>) -> Self {
        self.object_shapes = shapes.into_iter().collect();
        self
    }

    pub fn single(mut self) -> Self {
        self.cardinality = Cardinality::One;
        self
    }

    pub fn with_units<I, S>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unit_bearing = true;
        self.units = units.into_iter().map(Into::into).collect();
        self
    }

    pub fn requiring(mut self, part: SubPart) -> Self {
        self.requires.push(part);
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(ValueRange { min, max });
        self
    }

    pub fn with_provenance_required(mut self) -> Self {
        self.requires_provenance = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectTypeSpec {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Attribute keys every subject of this type must carry.
    #[serde(default)]
    pub required_attributes: Vec<String>,
}

impl SubjectTypeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            required_attributes: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_required_attribute(mut self, key: impl Into<String>) -> Self {
        self.required_attributes.push(key.into());
        self
    }
}

/// A validated, read-only ontology version.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    version: u64,
    subject_types: HashMap<String, SubjectTypeSpec>,
    relations: HashMap<String, RelationSpec>,
}

impl SchemaRegistry {
    pub fn builder(version: u64) -> RegistryBuilder {
        RegistryBuilder {
            version,
            subject_types: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn resolve_relation(&self, relation: &str) -> Option<&RelationSpec> {
        self.relations.get(relation)
    }

    pub fn resolve_subject_type(&self, subject_type: &str) -> Option<&SubjectTypeSpec> {
        self.subject_types.get(subject_type)
    }

    /// `true` if `subject_type` is `ancestor` or inherits from it.
    pub fn is_a(&self, subject_type: &str, ancestor: &str) -> bool {
        let mut current = Some(subject_type);
        // Parent chains are acyclic (checked at build time), bounded by type count.
        for _ in 0..=self.subject_types.len() {
            match current {
                Some(t) if t == ancestor => return true,
                Some(t) => current = self.subject_types.get(t).and_then(|s| s.parent.as_deref()),
                None => return false,
            }
        }
        false
    }

    /// Required attributes for a type, including those inherited from parents.
    pub fn required_attributes(&self, subject_type: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut current = self.subject_types.get(subject_type);
        let mut hops = 0;
        while let Some(spec) = current {
            out.extend(spec.required_attributes.iter().map(String::as_str));
            hops += 1;
            if hops > self.subject_types.len() {
                break;
            }
            current = spec.parent.as_deref().and_then(|p| self.subject_types.get(p));
        }
        out
    }

    pub fn relations(&self) -> impl Iterator<Item = &RelationSpec> {
        self.relations.values()
    }

    pub fn subject_types(&self) -> impl Iterator<Item = &SubjectTypeSpec> {
        self.subject_types.values()
    }
}

pub struct RegistryBuilder {
    version: u64,
    subject_types: Vec<SubjectTypeSpec>,
    relations: Vec<RelationSpec>,
}

impl RegistryBuilder {
    pub fn subject_type(mut self, spec: SubjectTypeSpec) -> Self {
        self.subject_types.push(spec);
        self
    }

    pub fn relation(mut self, spec: RelationSpec) -> Self {
        self.relations.push(spec);
        self
    }

    /// Check cross references and freeze the registry.
    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let mut subject_types = HashMap::new();
        for spec in self.subject_types {
            if subject_types.contains_key(&spec.name) {
                return Err(SchemaError::Duplicate {
                    kind: "subject type",
                    name: spec.name,
                });
            }
            subject_types.insert(spec.name.clone(), spec);
        }

        for spec in subject_types.values() {
            if let Some(parent) = &spec.parent {
                if !subject_types.contains_key(parent) {
                    return Err(SchemaError::UnknownParent {
                        name: spec.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            let mut seen = 0;
            let mut current = spec.parent.as_deref();
            while let Some(p) = current {
                seen += 1;
                if p == spec.name || seen > subject_types.len() {
                    return Err(SchemaError::CyclicParent(spec.name.clone()));
                }
                current = subject_types.get(p).and_then(|s| s.parent.as_deref());
            }
        }

        let mut relations = HashMap::new();
        for spec in self.relations {
            if relations.contains_key(&spec.name) {
                return Err(SchemaError::Duplicate {
                    kind: "relation",
                    name: spec.name,
                });
            }
            if let Some(t) = spec
                .subject_types
                .iter()
                .find(|t| !subject_types.contains_key(*t))
            {
                return Err(SchemaError::UnknownSubjectType {
                    relation: spec.name.clone(),
                    subject_type: t.clone(),
                });
            }
            if let Some(range) = spec.range {
                if range.min.is_nan() || range.max.is_nan() || range.min > range.max {
                    return Err(SchemaError::InvalidRange(spec.name));
                }
            }
            relations.insert(spec.name.clone(), spec);
        }

        Ok(SchemaRegistry {
            version: self.version,
            subject_types,
            relations,
        })
    }
}

/// Shared pointer to the current registry version.
///
/// Readers take a [`snapshot`](Self::snapshot) and keep it for the whole cycle.
#[derive(Debug, Clone, Default)]
pub struct RegistryHandle {
    current: Arc<RwLock<Arc<SchemaRegistry>>>,
}

impl RegistryHandle {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    pub fn snapshot(&self) -> Result<Arc<SchemaRegistry>, KosError> {
        let guard = self
            .current
            .read()
            .map_err(|e| KosError::LockPoisoned(format!("schema registry: {e}")))?;
        Ok(Arc::clone(&guard))
    }

    /// Install a new registry version. In-flight snapshots are unaffected.
    pub fn swap(&self, registry: SchemaRegistry) -> Result<Arc<SchemaRegistry>, KosError> {
        let mut guard = self
            .current
            .write()
            .map_err(|e| KosError::LockPoisoned(format!("schema registry: {e}")))?;
        let previous = std::mem::replace(&mut *guard, Arc::new(registry));
        tracing::info!(
            from = previous.version(),
            to = guard.version(),
            "schema registry swapped"
        );
        Ok(previous)
    }
}
