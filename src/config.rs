use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{KosError, KosResult};
use crate::kcycle::{CycleConfig, Switches, DEFAULT_PRIOR_CONFIDENCE, DEFAULT_QUARANTINE_THRESHOLD};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct KosConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub validation: ValidationConfig,
    pub ontology: OntologyConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// `"memory"` or `"sqlite"`.
    pub backend: String,
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ValidationConfig {
    pub oos_enabled: bool,
    pub vqf_enabled: bool,
    pub strict_mode: bool,
    pub quarantine_threshold: f64,
    pub default_confidence: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OntologyConfig {
    /// TOML ontology file. Without one the registry starts empty.
    pub schema_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_kos_dir()
            .join("kos.db")
            .to_string_lossy()
            .into_owned();
        Self {
            backend: "sqlite".into(),
            db_path,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            oos_enabled: true,
            vqf_enabled: true,
            strict_mode: false,
            quarantine_threshold: DEFAULT_QUARANTINE_THRESHOLD,
            default_confidence: DEFAULT_PRIOR_CONFIDENCE,
        }
    }
}

impl ValidationConfig {
    /// Convert to the per-cycle settings, rejecting values outside [0, 1].
    pub fn cycle_config(&self) -> KosResult<CycleConfig> {
        check_unit_interval("quarantine_threshold", self.quarantine_threshold)?;
        check_unit_interval("default_confidence", self.default_confidence)?;
        Ok(CycleConfig {
            switches: Switches {
                oos_enabled: self.oos_enabled,
                vqf_enabled: self.vqf_enabled,
                strict_mode: self.strict_mode,
            },
            quarantine_threshold: self.quarantine_threshold,
            default_confidence: self.default_confidence,
        })
    }
}

pub(crate) fn check_unit_interval(name: &str, value: f64) -> KosResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(KosError::Configuration {
            message: format!("{name} must be within [0, 1], got {value}"),
        })
    }
}

/// Returns `~/.kos/`, or `./.kos/` when no home directory is known.
pub fn default_kos_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kos")
}

/// Returns the default config file path: `~/.kos/config.toml`
pub fn default_config_path() -> PathBuf {
    default_kos_dir().join("config.toml")
}

impl KosConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            KosConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (KOS_STORAGE_TYPE, KOS_DB_PATH,
    /// KOS_LOG_LEVEL, KOS_STRICT_MODE, KOS_SCHEMA, KOS_API_PORT).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("KOS_STORAGE_TYPE") {
            self.storage.backend = val;
        }
        if let Ok(val) = std::env::var("KOS_DB_PATH") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("KOS_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("KOS_STRICT_MODE") {
            match parse_flag(&val) {
                Some(flag) => self.validation.strict_mode = flag,
                None => warn!(value = %val, "ignoring unparseable KOS_STRICT_MODE"),
            }
        }
        if let Ok(val) = std::env::var("KOS_SCHEMA") {
            self.ontology.schema_path = Some(val);
        }
        if let Ok(val) = std::env::var("KOS_API_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %val, "ignoring unparseable KOS_API_PORT"),
            }
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
