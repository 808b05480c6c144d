//! CLI `ingest` command: run statements from a JSON file through the K-Cycle.

use anyhow::{Context, Result};
use std::path::Path;

use kos::config::KosConfig;
use kos::engine::Persistence;
use kos::kcycle::Decision;
use kos::runtime::Kos;
use kos::spocm::Statement;

/// Parse a JSON document holding one statement or an array of statements.
pub fn parse_statements(text: &str) -> Result<Vec<Statement>> {
    let value: serde_json::Value = serde_json::from_str(text).context("file is not valid JSON")?;
    let statements = if value.is_array() {
        serde_json::from_value(value).context("invalid statement in array")?
    } else {
        vec![serde_json::from_value(value).context("invalid statement")?]
    };
    Ok(statements)
}

/// Ingest every statement in `path` and print one line per decision.
pub fn ingest(config: &KosConfig, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let statements = parse_statements(&text)?;

    let kos = Kos::open(config.clone())?;
    let engine = kos.engine();

    let (mut accepted, mut rejected, mut quarantined, mut failed) = (0, 0, 0, 0);
    for statement in statements {
        let result = engine.ingest(statement)?;
        let confidence = result
            .confidence
            .map(|c| format!("{c:.2}"))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<12} {}  confidence {}",
            result.decision.as_str().to_uppercase(),
            result.candidate_id,
            confidence
        );
        for v in &result.violations {
            println!("    {v}");
        }
        match (&result.decision, &result.persistence) {
            (Decision::Accepted, Persistence::Failed(e)) => {
                println!("    NOT STORED: {e}");
                failed += 1;
            }
            (Decision::Accepted, Persistence::Deduplicated) => {
                println!("    already stored");
                accepted += 1;
            }
            (Decision::Accepted, _) => accepted += 1,
            (Decision::Rejected, _) => rejected += 1,
            (Decision::Quarantined, _) => quarantined += 1,
        }
    }

    println!();
    println!(
        "{accepted} accepted, {rejected} rejected, {quarantined} quarantined, {failed} storage failures"
    );
    if quarantined > 0 {
        println!("Quarantined statements are only held while a server runs; ingest them through `kos serve` to review.");
    }

    kos.shutdown()
}
