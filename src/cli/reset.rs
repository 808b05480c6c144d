//! CLI `reset` command: delete all statements after user confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use kos::config::KosConfig;

/// Delete all statements and K-Cycle records after user confirmation.
pub fn reset(config: &KosConfig) -> Result<()> {
    let db_path = super::sqlite_path(config)?;

    println!("WARNING: This will permanently delete ALL statements and K-Cycle records.");
    println!("Database: {}", db_path.display());
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        bail!("reset cancelled");
    }

    let conn = kos::db::open_database(&db_path)?;
    conn.execute_batch(
        "DELETE FROM cycle_log;
         DELETE FROM statements;
         DELETE FROM schema_meta WHERE key = 'registry_version';",
    )?;

    println!("All statements deleted. Database reset complete.");
    Ok(())
}
