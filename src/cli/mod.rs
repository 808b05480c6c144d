pub mod doctor;
pub mod export;
pub mod find;
pub mod ingest;
pub mod inspect;
pub mod reset;
pub mod schema;
pub mod stats;

use anyhow::{bail, Result};
use std::path::PathBuf;

use kos::config::KosConfig;

/// Database path for the commands that work on the SQLite file directly.
fn sqlite_path(config: &KosConfig) -> Result<PathBuf> {
    if config.storage.backend != "sqlite" {
        bail!(
            "this command needs the sqlite backend (configured: {})",
            config.storage.backend
        );
    }
    Ok(config.resolved_db_path())
}
