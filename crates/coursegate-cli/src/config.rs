//! `coursegate.toml` loading and path resolution.
//!
//! Precedence: command-line flag, then config file, then built-in default.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "coursegate.toml";
pub const DEFAULT_CATALOG_PATH: &str = ".coursegate/catalog.jsonl";
pub const DEFAULT_COMPLETIONS_PATH: &str = ".coursegate/completions.jsonl";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{path}: {message}")]
    Read { path: String, message: String },

    #[error("{path}: invalid config: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub catalog: Option<String>,
    pub completions: Option<String>,
    pub log_filter: Option<String>,
}

impl Config {
    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(path, &text)
    }

    /// Load an explicit config path, or `coursegate.toml` if present.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn discover(explicit: Option<&str>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(Path::new(path)),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub catalog: PathBuf,
    pub completions: PathBuf,
    pub log_filter: String,
}

impl Settings {
    pub fn resolve(
        config: Config,
        catalog_flag: Option<String>,
        completions_flag: Option<String>,
    ) -> Self {
        Self {
            catalog: PathBuf::from(
                catalog_flag
                    .or(config.catalog)
                    .unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_string()),
            ),
            completions: PathBuf::from(
                completions_flag
                    .or(config.completions)
                    .unwrap_or_else(|| DEFAULT_COMPLETIONS_PATH.to_string()),
            ),
            log_filter: config
                .log_filter
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_which_overrides_defaults() {
        let config = Config {
            catalog: Some("from-config.jsonl".to_string()),
            completions: None,
            log_filter: Some("debug".to_string()),
        };
        let settings = Settings::resolve(config, Some("from-flag.jsonl".to_string()), None);

        assert_eq!(settings.catalog, PathBuf::from("from-flag.jsonl"));
        assert_eq!(settings.completions, PathBuf::from(DEFAULT_COMPLETIONS_PATH));
        assert_eq!(settings.log_filter, "debug");
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let err = Config::parse(Path::new("coursegate.toml"), "catalgo = \"x\"\n")
            .expect_err("typo must be rejected");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn parse_reads_all_keys() {
        let config = Config::parse(
            Path::new("coursegate.toml"),
            "catalog = \"a.jsonl\"\ncompletions = \"b.jsonl\"\nlog_filter = \"info\"\n",
        )
        .expect("config should parse");
        assert_eq!(config.catalog.as_deref(), Some("a.jsonl"));
        assert_eq!(config.completions.as_deref(), Some("b.jsonl"));
        assert_eq!(config.log_filter.as_deref(), Some("info"));
    }
}
