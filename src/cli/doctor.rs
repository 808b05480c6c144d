//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use kos::config::KosConfig;
use kos::db;
use kos::runtime::load_registry;

/// Run database and ontology diagnostics and print a health report.
pub fn doctor(config: &KosConfig) -> Result<()> {
    println!("kos Health Report");
    println!("=================");
    println!();

    match load_registry(config) {
        Ok(registry) => println!(
            "Ontology:          v{} ({} relations, {} subject types)",
            registry.version(),
            registry.relations().count(),
            registry.subject_types().count()
        ),
        Err(e) => println!("Ontology:          FAILED ({e:#})"),
    }
    if let Err(e) = config.validation.cycle_config() {
        println!("Validation:        FAILED ({e})");
    } else {
        println!(
            "Validation:        oos={} vqf={} strict={} threshold={:.2}",
            config.validation.oos_enabled,
            config.validation.vqf_enabled,
            config.validation.strict_mode,
            config.validation.quarantine_threshold
        );
    }
    println!();

    let db_path = match super::sqlite_path(config) {
        Ok(path) => path,
        Err(_) => {
            println!("Storage:           {} (nothing to check)", config.storage.backend);
            return Ok(());
        }
    };

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `kos serve` or `kos ingest` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let conn = db::open_database(&db_path)
        .context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn)
        .context("failed to run health check")?;

    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!(
        "Ontology version:  {} (last written)",
        report
            .registry_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(not set)".into())
    );
    println!();
    println!("Row counts:");
    println!("  Statements:      {}", report.statement_count);
    println!("  K-Cycle log:     {}", report.cycle_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db ~/.kos/kos.db");
        println!("  2. Or export from a good copy, reset, and re-ingest:");
        println!("     kos export > backup.json");
        println!("     kos reset && kos ingest backup.json");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
