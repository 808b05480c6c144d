//! The complete SPOC-M statement and its deduplication identity.

use serde::{Deserialize, Serialize};

use super::types::{Context, Mechanism, Metadata, Object, ObjectValue, Predicate, Subject};

/// A Subject-Predicate-Object-Context-Mechanism statement.
///
/// Fields are private: a statement never changes once built. Corrections are
/// new statements that point at the old one through [`Statement::supersedes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(default = "new_statement_id")]
    id: String,
    subject: Subject,
    predicate: Predicate,
    object: Object,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<Context>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mechanism: Option<Mechanism>,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    supersedes: Option<String>,
}

/// UUID v7 (time-sortable) statement id.
pub fn new_statement_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

impl Statement {
    pub fn new(subject: Subject, predicate: Predicate, object: Object) -> Self {
        Self {
            id: new_statement_id(),
            subject,
            predicate,
            object,
            context: None,
            mechanism: None,
            metadata: Metadata::default(),
            supersedes: None,
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_mechanism(mut self, mechanism: Mechanism) -> Self {
        self.mechanism = Some(mechanism);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_supersedes(mut self, id: impl Into<String>) -> Self {
        self.supersedes = Some(id.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Copy of this statement carrying the resolved confidence.
    pub(crate) fn resolved(&self, confidence: f64) -> Self {
        let mut out = self.clone();
        out.metadata.confidence = Some(confidence);
        out
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn relation(&self) -> &str {
        &self.predicate.relation
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    pub fn mechanism(&self) -> Option<&Mechanism> {
        self.mechanism.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn supersedes(&self) -> Option<&str> {
        self.supersedes.as_deref()
    }

    pub fn identity(&self) -> StatementIdentity<'_> {
        StatementIdentity {
            subject_id: &self.subject.id,
            relation: &self.predicate.relation,
            object: &self.object.value,
            context: self.context.as_ref(),
        }
    }

    /// Canonical encoding of [`Statement::identity`], stable across processes.
    pub fn identity_key(&self) -> String {
        self.identity().key()
    }

    /// Empty identifiers that make the statement unusable before any schema lookup.
    pub fn blank_fields(&self) -> Vec<&'static str> {
        let mut blank = Vec::new();
        if self.subject.id.trim().is_empty() {
            blank.push("subject.id");
        }
        if self.subject.subject_type.trim().is_empty() {
            blank.push("subject.type");
        }
        if self.predicate.relation.trim().is_empty() {
            blank.push("predicate.relation");
        }
        blank
    }
}

/// The (subject, relation, object, context) tuple that identifies a fact.
///
/// Two statements with equal identity and different metadata are revisions of
/// one another, not duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatementIdentity<'a> {
    pub subject_id: &'a str,
    pub relation: &'a str,
    pub object: &'a ObjectValue,
    pub context: Option<&'a Context>,
}

impl StatementIdentity<'_> {
    pub fn key(&self) -> String {
        // Attribute maps are BTreeMaps, so the JSON form is deterministic.
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!("{}|{}|{:?}", self.subject_id, self.relation, self.object)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spocm::Value;

    fn role(value: &str) -> Statement {
        Statement::new(
            Subject::new("user:001", "Person"),
            Predicate::new("hasRole"),
            Object::new(value),
        )
    }

    #[test]
    fn identity_ignores_metadata() {
        let a = role("Administrator");
        let b = role("Administrator").with_metadata(Metadata::default().with_author("ops"));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn identity_includes_object_and_context() {
        let a = role("Administrator");
        assert_ne!(a.identity_key(), role("Viewer").identity_key());
        let scoped = role("Administrator").with_context(Context::domain("billing"));
        assert_ne!(a.identity_key(), scoped.identity_key());
    }

    #[test]
    fn json_without_id_gets_one() {
        let json = r#"{
            "subject": {"id": "user:001", "type": "Person"},
            "predicate": {"relation": "hasRole"},
            "object": {"value": "Administrator"}
        }"#;
        let s: Statement = serde_json::from_str(json).unwrap();
        assert!(!s.id().is_empty());
        assert_eq!(s.object().value, ObjectValue::Literal(Value::from("Administrator")));
        assert_eq!(s.metadata().version, "2.5");
    }

    #[test]
    fn blank_fields_are_reported() {
        let s = Statement::new(Subject::new(" ", ""), Predicate::new(""), Object::new(1.0));
        assert_eq!(
            s.blank_fields(),
            vec!["subject.id", "subject.type", "predicate.relation"]
        );
    }

    #[test]
    fn resolved_sets_confidence_only() {
        let s = role("Administrator");
        let r = s.resolved(0.5);
        assert_eq!(r.metadata().confidence, Some(0.5));
        assert_eq!(r.id(), s.id());
        assert_eq!(r.identity(), s.identity());
    }
}
