//! Core configuration.
//!
//! # Responsibility
//! - Load settings from an optional TOML file.
//! - Apply `PERSONS_*` environment overrides on top.
//!
//! # Invariants
//! - Missing keys fall back to defaults; unknown keys are rejected.

use crate::logging::LoggingConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_DATABASE_PATH: &str = "PERSONS_DATABASE_PATH";
pub const ENV_IMAGE_DIR: &str = "PERSONS_IMAGE_DIR";
pub const ENV_LOG_LEVEL: &str = "PERSONS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PERSONS_LOG_DIR";

const DEFAULT_DATABASE_PATH: &str = "persons.sqlite3";
const DEFAULT_IMAGE_DIR: &str = "images";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub database_path: PathBuf,
    pub image_dir: PathBuf,
    pub log: LoggingConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            log: LoggingConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Reads `path` when given, then applies process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies overrides looked up by variable name; blank values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(path) = value(ENV_DATABASE_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(dir) = value(ENV_IMAGE_DIR) {
            self.image_dir = PathBuf::from(dir);
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            self.log.level = level;
        }
        if let Some(dir) = value(ENV_LOG_DIR) {
            self.log.dir = Some(PathBuf::from(dir));
        }
        self
    }
}
