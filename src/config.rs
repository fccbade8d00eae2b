use crate::aggregate::DateRange;
use crate::constants::*;
use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub aggregate: AggregateConfig,
    pub etl: EtlConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub input: PathBuf,
    pub top_k: usize,
    pub start_date: String,
    pub end_date: String,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_LICENSE_INPUT),
            top_k: DEFAULT_TOP_K,
            start_date: DEFAULT_RANGE_START.to_string(),
            end_date: DEFAULT_RANGE_END.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EtlConfig {
    pub input: PathBuf,
    pub database: PathBuf,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_EMPLOYEE_INPUT),
            database: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

impl Config {
    /// Read a TOML config file. Missing sections and keys take defaults.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Load the given file, or `config.toml` if present, or defaults; then
    /// apply environment overrides.
    pub fn resolve(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(Path::new(DEFAULT_CONFIG_PATH))?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// practice).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(DATABASE_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            debug!("Database path overridden by {}", DATABASE_ENV_VAR);
            self.etl.database = PathBuf::from(db.trim());
        }
    }

    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::parse(&self.aggregate.start_date, &self.aggregate.end_date)
    }
}
