//! Settings for the storage engine
//!
//! Settings are plain values injected into the service. They can be loaded
//! from a YAML file; anything missing falls back to the defaults:
//!
//! ```yaml
//! storage_path: ./storage
//! table_file_name_format: "{}.json"
//! tables_directory_name: tables
//! data_types:
//!   integer: integer
//!   price:
//!     pattern:
//!       regex: '^[0-9]+\.[0-9]{2}$'
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schema::types::TypeRegistry;
use crate::validation::is_valid_file_name;

/// Placeholder replaced by the table name in `table_file_name_format`
pub const NAME_PLACEHOLDER: &str = "{}";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Table file name format '{0}' must contain exactly one '{{}}' and name a single file")]
    InvalidFileNameFormat(String),

    #[error("Tables directory name '{0}' must be a single directory name")]
    InvalidTablesDirectoryName(String),

    #[error("Data type '{name}' has an invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// How a configured type name validates its values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTypeConfig {
    Char,
    Integer,
    Double,
    ComplexInteger,
    ComplexDouble,
    /// Values must match a regular expression
    Pattern { regex: String },
}

/// Storage and validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory holding one directory per database
    pub storage_path: PathBuf,
    /// File name of a table file, `{}` is replaced by the table name
    pub table_file_name_format: String,
    /// Subdirectory of a database directory holding its table files
    pub tables_directory_name: String,
    /// Registered column types by name
    pub data_types: BTreeMap<String, DataTypeConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./storage"),
            table_file_name_format: "{}.json".to_string(),
            tables_directory_name: "tables".to_string(),
            data_types: default_data_types(),
        }
    }
}

/// The built-in type names
pub fn default_data_types() -> BTreeMap<String, DataTypeConfig> {
    [
        ("char", DataTypeConfig::Char),
        ("integer", DataTypeConfig::Integer),
        ("double", DataTypeConfig::Double),
        ("complexInteger", DataTypeConfig::ComplexInteger),
        ("complexDouble", DataTypeConfig::ComplexDouble),
    ]
    .into_iter()
    .map(|(name, def)| (name.to_string(), def))
    .collect()
}

impl Settings {
    /// Settings with defaults rooted at `storage_path`
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            ..Self::default()
        }
    }

    /// Load settings from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.check()?;
        Ok(settings)
    }

    /// Check values that deserialization alone cannot
    ///
    /// Table files must sit directly in the tables directory, which must sit
    /// directly in the database directory.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.table_file_name_format.matches(NAME_PLACEHOLDER).count() != 1
            || !is_valid_file_name(&self.table_file_name("t"))
        {
            return Err(ConfigError::InvalidFileNameFormat(
                self.table_file_name_format.clone(),
            ));
        }
        if !is_valid_file_name(&self.tables_directory_name) {
            return Err(ConfigError::InvalidTablesDirectoryName(
                self.tables_directory_name.clone(),
            ));
        }
        self.type_registry().map(|_| ())
    }

    /// Build the type registry described by `data_types`
    pub fn type_registry(&self) -> Result<TypeRegistry, ConfigError> {
        TypeRegistry::from_config(&self.data_types)
    }

    /// File name of the table called `table_name`
    pub fn table_file_name(&self, table_name: &str) -> String {
        self.table_file_name_format
            .replacen(NAME_PLACEHOLDER, table_name, 1)
    }

    /// Table name encoded in `file_name`, if it follows the file name format
    pub fn table_name_from_file(&self, file_name: &str) -> Option<String> {
        let (prefix, suffix) = self.table_file_name_format.split_once(NAME_PLACEHOLDER)?;
        let name = file_name.strip_prefix(prefix)?.strip_suffix(suffix)?;
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_table_file_names() {
        let settings = Settings::default();
        assert_eq!(settings.table_file_name("items"), "items.json");
        assert_eq!(
            settings.table_name_from_file("items.json"),
            Some("items".to_string())
        );
        assert_eq!(settings.table_name_from_file("items.json.tmp"), None);
        assert_eq!(settings.table_name_from_file(".json"), None);
    }

    #[test]
    fn test_load_partial_yaml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(
            &path,
            "storage_path: /var/lib/jsondb\ndata_types:\n  integer: integer\n  someType:\n    pattern:\n      regex: '^-*[0-9]+$'\n",
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.storage_path, PathBuf::from("/var/lib/jsondb"));
        assert_eq!(settings.tables_directory_name, "tables");
        assert_eq!(settings.data_types.len(), 2);

        let registry = settings.type_registry().unwrap();
        assert!(registry.contains("someType"));
        assert!(!registry.contains("char"));
    }

    #[test]
    fn test_bad_file_name_format() {
        let settings = Settings {
            table_file_name_format: "table.json".into(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.check(),
            Err(ConfigError::InvalidFileNameFormat(_))
        ));
    }

    #[test]
    fn test_file_name_format_must_be_single_segment() {
        for format in ["sub/{}.json", "{}/table.json", "{}\0"] {
            let settings = Settings {
                table_file_name_format: format.into(),
                ..Settings::default()
            };
            assert!(
                matches!(settings.check(), Err(ConfigError::InvalidFileNameFormat(_))),
                "{} was accepted",
                format
            );
        }
    }

    #[test]
    fn test_tables_directory_must_be_single_segment() {
        for dir in ["..", ".", "", " ", "a/b"] {
            let settings = Settings {
                tables_directory_name: dir.into(),
                ..Settings::default()
            };
            assert!(
                matches!(settings.check(), Err(ConfigError::InvalidTablesDirectoryName(_))),
                "{:?} was accepted",
                dir
            );
        }
    }

    #[test]
    fn test_load_rejects_escaping_tables_directory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "tables_directory_name: ..\n").unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::InvalidTablesDirectoryName(_))
        ));
    }

    #[test]
    fn test_default_storage_path() {
        assert_eq!(Settings::default().storage_path, PathBuf::from("./storage"));
        assert!(Settings::default().check().is_ok());
    }

    #[test]
    fn test_bad_pattern_names_type() {
        let mut settings = Settings::default();
        settings
            .data_types
            .insert("broken".into(), DataTypeConfig::Pattern { regex: "[".into() });
        match settings.check() {
            Err(ConfigError::InvalidPattern { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("expected InvalidPattern, got {:?}", other),
        }
    }
}
