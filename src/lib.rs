//! Knowledge runtime: structured SPOC-M statements validated before they are stored.
//!
//! Every candidate statement passes through the **K-Cycle** before it may be
//! persisted:
//!
//! | Stage | Checks | On failure |
//! |-------|--------|------------|
//! | **OOS** | names, subject types, object shapes, required parts, cardinality, supersedes | `REJECTED` |
//! | **VQF** | units, ranges, temporal order, provenance, declared types | confidence penalty, or `REJECTED` in strict mode |
//! | **Confidence** | `clamp(prior + Σ adjustments − structural penalty, 0, 1)` | below threshold → `QUARANTINED` (accepted in strict mode) |
//!
//! # Architecture
//!
//! - **Model**: [`spocm`] statements (Subject, Predicate, Object, Context, Mechanism + Metadata)
//! - **Schema**: an immutable [`ontology::SchemaRegistry`] swapped atomically between versions
//! - **Engine**: [`engine::KnowledgeEngine`] serializes acceptances per (subject, relation)
//! - **Storage**: the [`storage::StatementStore`] contract, in memory or SQLite
//! - **Transport**: MCP over stdio or Streamable HTTP ([`server`], [`tools`])
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, migrations, and health checks
//! - [`kcycle`]: The validation pipeline and its state machine
//! - [`runtime`]: Wires configuration, storage, ontology and engine together

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod kcycle;
pub mod ontology;
pub mod runtime;
pub mod server;
pub mod spocm;
pub mod storage;
pub mod tools;
