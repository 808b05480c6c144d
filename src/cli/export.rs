use anyhow::Result;

use kos::config::KosConfig;
use kos::spocm::Statement;

/// Export current statements as a JSON array on stdout.
///
/// The output is accepted by `kos ingest`. Superseded statements are left out
/// so re-ingesting the export rebuilds the current view.
pub fn export(config: &KosConfig) -> Result<()> {
    let db_path = super::sqlite_path(config)?;
    let conn = kos::db::open_database(&db_path)?;

    let mut stmt = conn.prepare(
        "SELECT body FROM statements WHERE superseded_by IS NULL ORDER BY rowid",
    )?;
    let bodies: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let statements = bodies
        .iter()
        .map(|b| serde_json::from_str::<Statement>(b))
        .collect::<Result<Vec<_>, _>>()?;

    let json = serde_json::to_string_pretty(&statements)?;
    println!("{json}");

    eprintln!("Exported {} statements.", statements.len());
    Ok(())
}
