//! Process-level wiring: configuration → storage → registry → engine.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{expand_tilde, KosConfig};
use crate::engine::KnowledgeEngine;
use crate::ontology::{loader, SchemaRegistry};
use crate::storage::{self, StatementStore};

/// A running kos instance.
pub struct Kos {
    config: KosConfig,
    engine: Arc<KnowledgeEngine>,
}

impl Kos {
    /// Open the configured store, load the ontology and build the engine.
    pub fn open(config: KosConfig) -> Result<Self> {
        let store = storage::open_store(&config.storage).with_context(|| {
            format!("failed to open {} storage", config.storage.backend)
        })?;
        let registry = load_registry(&config)?;
        Self::from_parts(config, store, registry)
    }

    /// Build from an already opened store and registry.
    pub fn from_parts(
        config: KosConfig,
        store: Arc<dyn StatementStore>,
        registry: SchemaRegistry,
    ) -> Result<Self> {
        let cycle = config
            .validation
            .cycle_config()
            .context("invalid [validation] settings")?;
        let engine = KnowledgeEngine::new(store, registry, cycle)?;
        tracing::info!(backend = %config.storage.backend, "kos runtime started");
        Ok(Self {
            config,
            engine: Arc::new(engine),
        })
    }

    pub fn engine(&self) -> Arc<KnowledgeEngine> {
        Arc::clone(&self.engine)
    }

    pub fn config(&self) -> &KosConfig {
        &self.config
    }

    /// Close storage. Quarantined statements still held in memory are dropped.
    pub fn shutdown(self) -> Result<()> {
        let pending = self.engine.quarantined().len();
        if pending > 0 {
            tracing::warn!(pending, "shutting down with unreviewed quarantined statements");
        }
        self.engine.close().context("failed to close storage")?;
        tracing::info!("kos runtime stopped");
        Ok(())
    }
}

/// Ontology from `[ontology] schema_path`, or an empty registry.
pub fn load_registry(config: &KosConfig) -> Result<SchemaRegistry> {
    match &config.ontology.schema_path {
        Some(path) => loader::load_file(expand_tilde(path)),
        None => {
            tracing::warn!("no ontology configured; every relation will be rejected");
            Ok(SchemaRegistry::builder(0).build()?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kcycle::Decision;
    use crate::spocm::{Object, Predicate, Statement, Subject};

    const ONTOLOGY: &str = r#"
version = 3

[[subject_types]]
name = "Person"

[[relations]]
name = "hasRole"
subject_types = ["Person"]
cardinality = "one"
"#;

    fn memory_config() -> KosConfig {
        let mut config = KosConfig::default();
        config.storage.backend = "memory".into();
        config
    }

    #[test]
    fn open_with_ontology_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ontology.toml");
        std::fs::write(&path, ONTOLOGY).unwrap();

        let mut config = memory_config();
        config.ontology.schema_path = Some(path.to_string_lossy().into_owned());
        let kos = Kos::open(config).unwrap();
        assert_eq!(kos.engine().registry().unwrap().version(), 3);

        let result = kos
            .engine()
            .ingest(Statement::new(
                Subject::new("user:001", "Person"),
                Predicate::new("hasRole"),
                Object::new("Administrator"),
            ))
            .unwrap();
        assert_eq!(result.decision, Decision::Accepted);
        kos.shutdown().unwrap();
    }

    #[test]
    fn invalid_validation_settings_fail_to_open() {
        let mut config = memory_config();
        config.validation.default_confidence = 2.0;
        assert!(Kos::open(config).is_err());
    }

    #[test]
    fn sqlite_backend_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = KosConfig::default();
        config.storage.db_path = dir.path().join("kos.db").to_string_lossy().into_owned();
        let path = dir.path().join("ontology.toml");
        std::fs::write(&path, ONTOLOGY).unwrap();
        config.ontology.schema_path = Some(path.to_string_lossy().into_owned());

        let kos = Kos::open(config.clone()).unwrap();
        let id = kos
            .engine()
            .ingest(Statement::new(
                Subject::new("user:001", "Person"),
                Predicate::new("hasRole"),
                Object::new("Administrator"),
            ))
            .unwrap()
            .candidate_id;
        kos.shutdown().unwrap();

        let kos = Kos::open(config).unwrap();
        assert!(kos.engine().lookup(&id).unwrap().is_some());
        kos.shutdown().unwrap();
    }
}
