//! Store configuration
//!
//! Configuration loaded from .unistore.toml. Every key is optional.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-store settings fixed at construction time
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Label used in log lines
    #[serde(default = "default_name")]
    pub name: String,

    /// Panic when a reducer dispatches synchronously into the store it is
    /// reducing. When off, such dispatches are queued behind the current one.
    #[serde(default)]
    pub strict_reentrancy: bool,

    /// Projected subscribers (substores, paired stores) drop consecutive
    /// equal values
    #[serde(default = "default_skip_repeats")]
    pub skip_repeats: bool,

    /// Install the logging middleware ahead of user middleware
    #[serde(default)]
    pub log_actions: bool,
}

fn default_name() -> String {
    "store".to_string()
}

fn default_skip_repeats() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            strict_reentrancy: false,
            skip_repeats: default_skip_repeats(),
            log_actions: false,
        }
    }
}

impl StoreConfig {
    /// Config with the given name and defaults for everything else
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load config from CWD first, then home directory, or use defaults
    pub fn load() -> Self {
        if let Some(content) = crate::load_config_file() {
            match Self::from_toml_str(&content) {
                Ok(config) => {
                    log::info!("Loaded store config from file");
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse config file: {}", e);
                }
            }
        }

        log::debug!("Using default store config");
        Self::default()
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.name, "store");
        assert!(!config.strict_reentrancy);
        assert!(config.skip_repeats);
        assert!(!config.log_actions);
    }

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            name = "app"
            strict_reentrancy = true
            log_actions = true
        "#;
        let config = StoreConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.name, "app");
        assert!(config.strict_reentrancy);
        assert!(config.log_actions);
        // skip_repeats should use default
        assert!(config.skip_repeats);
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config = StoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn test_config_parse_error() {
        let err = StoreConfig::from_toml_str("strict_reentrancy = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_config_missing_file() {
        let err = StoreConfig::from_path("/definitely/not/here/.unistore.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_named() {
        let config = StoreConfig::named("child");
        assert_eq!(config.name, "child");
        assert!(config.skip_repeats);
    }
}
