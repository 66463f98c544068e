//! Core configuration
//!
//! Loaded from a JSON file. Every field has a default, so an empty object
//! is a valid configuration.
//!
//! ```json
//! {
//!   "compression_level": 3,
//!   "log_level": "info",
//!   "schema_dir": "./schemas"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Severity};

/// Lowest and highest zstd levels accepted
pub const COMPRESSION_LEVELS: std::ops::RangeInclusive<i32> = 1..=22;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("compression_level {0} out of range 1..=22")]
    CompressionLevel(i32),
}

/// Configuration shared by the packer, the loader and the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// zstd level for compressed payloads
    pub compression_level: i32,
    /// Minimum severity written by the logger
    pub log_level: Severity,
    /// Directory of `*.json` type descriptions
    pub schema_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
            log_level: Severity::Info,
            schema_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads and validates a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: CoreConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;

        let path = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", path.as_str())]);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !COMPRESSION_LEVELS.contains(&self.compression_level) {
            return Err(ConfigError::CompressionLevel(self.compression_level));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.compression_level, 3);
        assert_eq!(config.log_level, Severity::Info);
        assert!(config.schema_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: CoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keyquery.json");
        fs::write(
            &path,
            r#"{ "compression_level": 9, "log_level": "trace", "schema_dir": "schemas" }"#,
        )
        .unwrap();

        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config.compression_level, 9);
        assert_eq!(config.log_level, Severity::Trace);
        assert_eq!(config.schema_dir, Some(PathBuf::from("schemas")));
    }

    #[test]
    fn test_level_out_of_range_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keyquery.json");
        fs::write(&path, r#"{ "compression_level": 40 }"#).unwrap();

        assert!(matches!(
            CoreConfig::load(&path),
            Err(ConfigError::CompressionLevel(40))
        ));
    }

    #[test]
    fn test_missing_file_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            CoreConfig::load(&dir.path().join("absent.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}
