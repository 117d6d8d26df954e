//! Per-workspace settings from `rozvrh.toml`, overridable through the environment.

use crate::error::ConfigError;
use crate::store::DEFAULT_STORAGE_KEY;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "rozvrh.toml";

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_seed_defaults() -> bool {
    true
}

fn default_max_document_bytes() -> usize {
    5 * 1024 * 1024
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Key the document blob is stored under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Seed the default school data into an empty workspace when it is opened.
    #[serde(default = "default_seed_defaults")]
    pub seed_defaults: bool,
    /// Storage quota in bytes; 0 disables the limit.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_key: default_storage_key(),
            seed_defaults: default_seed_defaults(),
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

pub fn config_path(workspace: &Path) -> PathBuf {
    workspace.join(CONFIG_FILE_NAME)
}

impl Config {
    /// File settings (defaults when the file is missing) with `ROZVRH_*` variables on top.
    pub fn load(workspace: &Path) -> Result<Config, ConfigError> {
        let mut config = Config::from_file(&config_path(workspace))?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(key) = lookup("ROZVRH_STORAGE_KEY").filter(|k| !k.trim().is_empty()) {
            self.storage_key = key;
        }
        if let Some(raw) = lookup("ROZVRH_SEED_DEFAULTS") {
            self.seed_defaults = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidOverride {
                        key: "ROZVRH_SEED_DEFAULTS",
                        value: raw,
                    })
                }
            };
        }
        if let Some(raw) = lookup("ROZVRH_MAX_DOCUMENT_BYTES") {
            self.max_document_bytes =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidOverride {
                        key: "ROZVRH_MAX_DOCUMENT_BYTES",
                        value: raw.clone(),
                    })?;
        }
        Ok(())
    }

    pub fn quota(&self) -> Option<usize> {
        (self.max_document_bytes > 0).then_some(self.max_document_bytes)
    }
}
