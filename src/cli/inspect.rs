//! CLI `inspect` command: display a statement and its K-Cycle records.

use anyhow::Result;

use kos::config::KosConfig;
use kos::runtime::Kos;

/// Inspect a single statement (or rejected candidate) by ID.
pub fn inspect(config: &KosConfig, id: &str) -> Result<()> {
    let kos = Kos::open(config.clone())?;
    let engine = kos.engine();

    let stored = engine.lookup(id)?;
    let cycles = engine.audit_for(id)?;

    if stored.is_none() && cycles.is_empty() {
        println!("No statement or cycle record with id {id}");
        return kos.shutdown();
    }

    if let Some(ref s) = stored {
        let st = &s.statement;
        println!("Statement: {}", st.id());
        println!("{}", "=".repeat(50));
        println!("  Subject:        {} ({})", st.subject().id, st.subject().subject_type);
        println!("  Relation:       {}", st.relation());
        println!("  Object:         {}", serde_json::to_string(&st.object().value)?);
        if let Some(c) = st.metadata().confidence {
            println!("  Confidence:     {c:.2}");
        }
        println!("  Stored:         {}", s.stored_at);
        if let Some(old) = st.supersedes() {
            println!("  Supersedes:     {old}");
        }
        if let Some(ref by) = s.superseded_by {
            println!("  Superseded by:  {by}");
        }
        println!();
        println!("{}", serde_json::to_string_pretty(st)?);
    }

    for record in &cycles {
        println!();
        println!(
            "K-Cycle {} [{}] schema v{}",
            record.recorded_at, record.decision, record.registry_version
        );
        for entry in &record.audit {
            println!(
                "  {} {} -> {} ({}): {}",
                entry.at.to_rfc3339(),
                entry.stage,
                entry.next,
                entry.outcome,
                entry.detail
            );
        }
        for v in &record.violations {
            println!("  ! {v}");
        }
    }

    kos.shutdown()
}
