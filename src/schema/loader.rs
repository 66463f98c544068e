//! Loader for type descriptions stored as JSON
//!
//! One file per type, `*.json`, in a single directory. Files are read in
//! path order so registration order is deterministic.
//!
//! ```json
//! {
//!   "type_name": "Trades.Trade",
//!   "primary_key": { "name": "Id", "kind": "integer" },
//!   "unique_keys": [{ "name": "ContractId", "kind": "integer" }],
//!   "index_keys": [{ "name": "ValueDate", "kind": "date_time" }],
//!   "list_index_keys": [{ "name": "Accounts", "kind": "integer" }],
//!   "full_text": ["Comment"],
//!   "compressed": false
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::keys::KeyKind;
use crate::observability::{log_event_with_fields, Event};

use super::errors::{SchemaError, SchemaResult};
use super::registry::SchemaRegistry;
use super::types::TypeDescription;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FieldSpec {
    name: String,
    kind: KeyKind,
}

/// On-disk layout of a type description
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DescriptionFile {
    type_name: String,
    #[serde(default)]
    primary_key: Option<FieldSpec>,
    #[serde(default)]
    unique_keys: Vec<FieldSpec>,
    #[serde(default)]
    index_keys: Vec<FieldSpec>,
    #[serde(default)]
    list_index_keys: Vec<FieldSpec>,
    #[serde(default)]
    full_text: Vec<String>,
    #[serde(default)]
    compressed: bool,
}

impl DescriptionFile {
    fn into_description(self) -> SchemaResult<TypeDescription> {
        let mut builder = TypeDescription::builder(self.type_name).compressed(self.compressed);

        if let Some(pk) = self.primary_key {
            builder = builder.primary_key(pk.name, pk.kind);
        }
        for field in self.unique_keys {
            builder = builder.unique_key(field.name, field.kind);
        }
        for field in self.index_keys {
            builder = builder.index(field.name, field.kind);
        }
        for field in self.list_index_keys {
            builder = builder.list_index(field.name, field.kind);
        }
        for name in self.full_text {
            builder = builder.full_text(name);
        }

        builder.build()
    }
}

/// Parses a single description from JSON text.
pub fn parse_description(json: &str) -> SchemaResult<TypeDescription> {
    let file: DescriptionFile = serde_json::from_str(json)
        .map_err(|e| SchemaError::malformed_description("<inline>", format!("Invalid JSON: {}", e)))?;
    file.into_description()
}

/// Reads type descriptions from a directory.
pub struct SchemaLoader {
    schema_dir: PathBuf,
    descriptions: Vec<TypeDescription>,
}

impl SchemaLoader {
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
            descriptions: Vec::new(),
        }
    }

    /// Loads every `*.json` file of the directory.
    ///
    /// A missing directory loads nothing. Any unreadable or invalid file is a
    /// FATAL error.
    pub fn load_all(&mut self) -> SchemaResult<usize> {
        if !self.schema_dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(&self.schema_dir).map_err(|e| {
            SchemaError::malformed_description(
                self.schema_dir.display().to_string(),
                format!("Failed to read schema directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::malformed_description(
                    self.schema_dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            let description = Self::load_file(path)?;
            self.descriptions.push(description);
        }

        let count = paths.len().to_string();
        let dir = self.schema_dir.display().to_string();
        log_event_with_fields(
            Event::SchemasLoaded,
            &[("count", count.as_str()), ("dir", dir.as_str())],
        );

        Ok(paths.len())
    }

    /// Loads a single description file.
    pub fn load_file(path: &Path) -> SchemaResult<TypeDescription> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed_description(
                path.display().to_string(),
                format!("Failed to read file: {}", e),
            )
        })?;

        let file: DescriptionFile = serde_json::from_str(&content).map_err(|e| {
            SchemaError::malformed_description(
                path.display().to_string(),
                format!("Invalid JSON: {}", e),
            )
        })?;

        file.into_description()
    }

    /// Returns the loaded descriptions in load order.
    pub fn descriptions(&self) -> &[TypeDescription] {
        &self.descriptions
    }

    /// Registers every loaded description into a registry.
    pub fn register_into(&self, registry: &SchemaRegistry) -> SchemaResult<()> {
        for description in &self.descriptions {
            registry.register_description(description.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyRole;
    use crate::schema::SchemaErrorCode;
    use tempfile::TempDir;

    const TRADE: &str = r#"{
        "type_name": "Trades.Trade",
        "primary_key": { "name": "Id", "kind": "integer" },
        "index_keys": [
            { "name": "Folder", "kind": "text" },
            { "name": "ValueDate", "kind": "date_time" }
        ],
        "list_index_keys": [{ "name": "Accounts", "kind": "integer" }],
        "full_text": ["Comment"],
        "compressed": true
    }"#;

    #[test]
    fn test_parse_description() {
        let description = parse_description(TRADE).unwrap();
        assert_eq!(description.type_name(), "Trades.Trade");
        assert!(description.compressed());
        assert_eq!(description.index_keys().len(), 2);
        assert_eq!(
            description.key_field("Accounts").map(|f| f.role),
            Some(KeyRole::ListIndex)
        );
    }

    #[test]
    fn test_missing_primary_key_is_unregistered() {
        let err = parse_description(r#"{ "type_name": "Loose" }"#).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::UnregisteredType);
    }

    #[test]
    fn test_load_all_sorted_and_registered() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b_trade.json"), TRADE).unwrap();
        fs::write(
            dir.path().join("a_home.json"),
            r#"{ "type_name": "Homes.Home", "primary_key": { "name": "Id", "kind": "integer" } }"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut loader = SchemaLoader::new(dir.path());
        assert_eq!(loader.load_all().unwrap(), 2);
        assert_eq!(loader.descriptions()[0].type_name(), "Homes.Home");

        let registry = SchemaRegistry::new();
        loader.register_into(&registry).unwrap();
        assert!(registry.description("Trades.Trade").is_ok());
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let mut loader = SchemaLoader::new(dir.path());
        let err = loader.load_all().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_directory_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let mut loader = SchemaLoader::new(dir.path().join("absent"));
        assert_eq!(loader.load_all().unwrap(), 0);
    }
}
