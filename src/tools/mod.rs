pub mod find_statements;
pub mod ingest_statement;
pub mod list_quarantine;
pub mod lookup_statement;
pub mod review_quarantine;

use find_statements::FindStatementsParams;
use ingest_statement::IngestStatementParams;
use list_quarantine::ListQuarantineParams;
use lookup_statement::LookupStatementParams;
use review_quarantine::ReviewQuarantineParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use serde::Serialize;
use std::sync::Arc;

use crate::engine::KnowledgeEngine;
use crate::error::KosResult;
use crate::spocm::Statement;
use crate::storage::StatementFilter;

/// The kos MCP tool handler. Every call goes through the shared
/// [`KnowledgeEngine`]; engine work is synchronous, so it runs on the
/// blocking pool.
#[derive(Clone)]
pub struct KosTools {
    tool_router: ToolRouter<Self>,
    engine: Arc<KnowledgeEngine>,
}

/// Run a blocking engine call and serialize its result.
async fn run_engine<T, F>(engine: &Arc<KnowledgeEngine>, call: F) -> Result<String, String>
where
    T: Serialize + Send + 'static,
    F: FnOnce(&KnowledgeEngine) -> KosResult<T> + Send + 'static,
{
    let engine = Arc::clone(engine);
    let value = tokio::task::spawn_blocking(move || call(engine.as_ref()))
        .await
        .map_err(|e| format!("engine task failed: {e}"))?
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&value).map_err(|e| format!("serialization failed: {e}"))
}

#[tool_router]
impl KosTools {
    pub fn new(engine: Arc<KnowledgeEngine>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            engine,
        }
    }

    /// Submit a candidate statement to the K-Cycle.
    #[tool(description = "Validate and store a SPOC-M statement. Returns the decision (accepted, rejected, quarantined), resolved confidence, violations and the full audit trail.")]
    async fn ingest_statement(
        &self,
        Parameters(params): Parameters<IngestStatementParams>,
    ) -> Result<String, String> {
        let candidate: Statement = serde_json::from_value(params.statement)
            .map_err(|e| format!("invalid statement: {e}"))?;

        tracing::info!(
            statement_id = %candidate.id(),
            relation = %candidate.relation(),
            "ingest_statement called"
        );

        run_engine(&self.engine, move |engine| engine.ingest(candidate)).await
    }

    /// Fetch a statement by id.
    #[tool(description = "Look up a stored statement by ID, optionally with its K-Cycle audit records.")]
    async fn lookup_statement(
        &self,
        Parameters(params): Parameters<LookupStatementParams>,
    ) -> Result<String, String> {
        tracing::info!(id = %params.id, "lookup_statement called");
        let include_audit = params.include_audit.unwrap_or(false);
        let id = params.id;

        run_engine(&self.engine, move |engine| {
            let stored = engine.lookup(&id)?;
            let cycles = if include_audit {
                Some(engine.audit_for(&id)?)
            } else {
                None
            };
            if stored.is_none() && cycles.as_ref().map_or(true, Vec::is_empty) {
                return Ok(serde_json::json!({ "status": "not_found", "id": id }));
            }
            Ok(serde_json::json!({ "statement": stored, "cycles": cycles }))
        })
        .await
    }

    /// Statements about a subject.
    #[tool(description = "Find current statements about a subject, optionally narrowed to one relation. Set include_superseded for history.")]
    async fn find_statements(
        &self,
        Parameters(params): Parameters<FindStatementsParams>,
    ) -> Result<String, String> {
        tracing::info!(subject = %params.subject_id, "find_statements called");
        let mut filter = StatementFilter::current(&params.subject_id, params.relation.as_deref());
        filter.include_superseded = params.include_superseded.unwrap_or(false);

        run_engine(&self.engine, move |engine| {
            engine.history(&filter.subject_id, filter.relation.as_deref()).map(|all| {
                all.into_iter()
                    .filter(|s| filter.matches(s))
                    .collect::<Vec<_>>()
            })
        })
        .await
    }

    /// Statements held for manual review.
    #[tool(description = "List statements held in quarantine for manual review.")]
    async fn list_quarantine(
        &self,
        Parameters(params): Parameters<ListQuarantineParams>,
    ) -> Result<String, String> {
        tracing::info!("list_quarantine called");
        let subject = params.subject_id;
        run_engine(&self.engine, move |engine| {
            Ok(engine
                .quarantined()
                .into_iter()
                .filter(|q| subject.as_deref().map_or(true, |s| q.statement.subject().id == s))
                .collect::<Vec<_>>())
        })
        .await
    }

    /// Promote or discard a quarantined statement.
    #[tool(description = "Review a quarantined statement: action 'promote' re-checks and stores it, 'discard' drops it.")]
    async fn review_quarantine(
        &self,
        Parameters(params): Parameters<ReviewQuarantineParams>,
    ) -> Result<String, String> {
        tracing::info!(id = %params.id, action = %params.action, "review_quarantine called");
        let id = params.id;
        match params.action.as_str() {
            "promote" => run_engine(&self.engine, move |engine| engine.promote(&id)).await,
            "discard" => run_engine(&self.engine, move |engine| engine.discard(&id)).await,
            other => Err(format!("unknown action: {other} (expected 'promote' or 'discard')")),
        }
    }
}

#[tool_handler]
impl ServerHandler for KosTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "kos is a validated knowledge store. Use ingest_statement to submit SPOC-M \
                 statements, find_statements and lookup_statement to read them, and \
                 list_quarantine / review_quarantine to handle held statements."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kcycle::CycleConfig;
    use crate::ontology::{RelationSpec, SchemaRegistry, SubjectTypeSpec};
    use crate::storage::memory::MemoryStore;

    fn tools() -> KosTools {
        let registry = SchemaRegistry::builder(1)
            .subject_type(SubjectTypeSpec::new("Person"))
            .relation(RelationSpec::new("hasRole").subjects(["Person"]).single())
            .build()
            .unwrap();
        let engine =
            KnowledgeEngine::new(Arc::new(MemoryStore::new()), registry, CycleConfig::default())
                .unwrap();
        KosTools::new(Arc::new(engine))
    }

    fn role(value: &str, confidence: Option<f64>) -> serde_json::Value {
        let mut statement = serde_json::json!({
            "subject": { "id": "user:001", "type": "Person" },
            "predicate": { "relation": "hasRole" },
            "object": { "value": value },
        });
        if let Some(c) = confidence {
            statement["metadata"] = serde_json::json!({ "confidence": c });
        }
        statement
    }

    async fn ingest(tools: &KosTools, statement: serde_json::Value) -> serde_json::Value {
        let out = tools
            .ingest_statement(Parameters(IngestStatementParams { statement }))
            .await
            .unwrap();
        serde_json::from_str(&out).unwrap()
    }

    #[tokio::test]
    async fn ingest_then_find() {
        let tools = tools();
        let result = ingest(&tools, role("Administrator", None)).await;
        assert_eq!(result["decision"], "accepted");
        assert_eq!(result["confidence"], 0.5);
        assert_eq!(result["persistence"]["status"], "stored");

        let out = tools
            .find_statements(Parameters(FindStatementsParams {
                subject_id: "user:001".into(),
                relation: Some("hasRole".into()),
                include_superseded: None,
            }))
            .await
            .unwrap();
        let found: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(found.as_array().unwrap().len(), 1);

        let second = ingest(&tools, role("Viewer", None)).await;
        assert_eq!(second["decision"], "rejected");
        assert!(second["statement"].is_null());
    }

    #[tokio::test]
    async fn malformed_statement_is_an_error() {
        let tools = tools();
        let err = tools
            .ingest_statement(Parameters(IngestStatementParams {
                statement: serde_json::json!({ "subject": "nope" }),
            }))
            .await
            .unwrap_err();
        assert!(err.starts_with("invalid statement"));
    }

    #[tokio::test]
    async fn lookup_reports_not_found() {
        let tools = tools();
        let out = tools
            .lookup_statement(Parameters(LookupStatementParams {
                id: "missing".into(),
                include_audit: Some(true),
            }))
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["status"], "not_found");
    }

    #[tokio::test]
    async fn quarantine_review_flow() {
        let tools = tools();
        let held = ingest(&tools, role("Administrator", Some(0.1))).await;
        assert_eq!(held["decision"], "quarantined");
        let id = held["candidate_id"].as_str().unwrap().to_string();

        let out = tools
            .list_quarantine(Parameters(ListQuarantineParams { subject_id: None }))
            .await
            .unwrap();
        let queue: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(queue.as_array().unwrap().len(), 1);

        let err = tools
            .review_quarantine(Parameters(ReviewQuarantineParams {
                id: id.clone(),
                action: "maybe".into(),
            }))
            .await
            .unwrap_err();
        assert!(err.contains("unknown action"));

        let out = tools
            .review_quarantine(Parameters(ReviewQuarantineParams {
                id,
                action: "promote".into(),
            }))
            .await
            .unwrap();
        let promoted: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(promoted["decision"], "accepted");
    }
}
