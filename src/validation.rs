//! Input validation
//!
//! Database, table and attribute names end up as path segments, so they must
//! be legal file names on the host OS. Table schemes and rows are checked
//! against the configured type registry.

use std::collections::HashSet;
use thiserror::Error;

use crate::schema::types::TypeRegistry;
use crate::schema::{Attribute, Row, Table, TableScheme};

/// Why an attribute was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("Attribute name '{0}' is invalid")]
    InvalidName(String),

    #[error("Attribute '{name}' has unknown type '{data_type}'")]
    UnknownType { name: String, data_type: String },

    #[error("Attribute name '{0}' is not unique")]
    Duplicate(String),
}

/// Why a table scheme was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemeError {
    #[error("Table name '{0}' is invalid")]
    InvalidTableName(String),

    /// `None` when the scheme has no attributes at all
    #[error("Table scheme has invalid attributes{}", describe_cause(.0))]
    InvalidTableAttributes(#[source] Option<AttributeError>),
}

fn describe_cause(cause: &Option<AttributeError>) -> String {
    match cause {
        Some(err) => format!(": {}", err),
        None => ": none given".to_string(),
    }
}

/// Well-formedness checks used by the database service
pub trait Validation: Send + Sync {
    /// Whether `name` can name a database
    fn is_valid_database_name(&self, name: &str) -> bool;

    /// Check a table scheme; the first failing rule is reported
    fn check_table_scheme(&self, scheme: &TableScheme) -> Result<(), SchemeError>;

    /// Whether `row` has one legal value per column of `table`
    fn does_row_fit_table(&self, table: &Table, row: &Row) -> bool;
}

/// Names that resolve to something other than a child directory
const RESERVED_NAMES: &[&str] = &[".", ".."];

#[cfg(windows)]
fn is_invalid_file_name_char(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_ascii_control()
}

#[cfg(not(windows))]
fn is_invalid_file_name_char(c: char) -> bool {
    matches!(c, '/' | '\0')
}

/// Whether `name` can be used as a single path segment
///
/// Rejects empty and whitespace-only names, names with characters the host
/// file system forbids in a file name, and `.`/`..`.
pub fn is_valid_file_name(name: &str) -> bool {
    !name.trim().is_empty()
        && !name.chars().any(is_invalid_file_name_char)
        && !RESERVED_NAMES.contains(&name)
}

/// Validation against a type registry
#[derive(Debug, Clone)]
pub struct DatabaseValidation {
    types: TypeRegistry,
}

impl DatabaseValidation {
    pub fn new(types: TypeRegistry) -> Self {
        Self { types }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Check a single attribute's name and type
    pub fn check_attribute(&self, attribute: &Attribute) -> Result<(), AttributeError> {
        if !is_valid_file_name(&attribute.name) {
            return Err(AttributeError::InvalidName(attribute.name.clone()));
        }

        if !self.types.contains(&attribute.data_type) {
            return Err(AttributeError::UnknownType {
                name: attribute.name.clone(),
                data_type: attribute.data_type.clone(),
            });
        }

        Ok(())
    }
}

impl Validation for DatabaseValidation {
    fn is_valid_database_name(&self, name: &str) -> bool {
        is_valid_file_name(name)
    }

    fn check_table_scheme(&self, scheme: &TableScheme) -> Result<(), SchemeError> {
        if !is_valid_file_name(&scheme.name) {
            return Err(SchemeError::InvalidTableName(scheme.name.clone()));
        }

        if scheme.attributes.is_empty() {
            return Err(SchemeError::InvalidTableAttributes(None));
        }

        for attribute in &scheme.attributes {
            self.check_attribute(attribute)
                .map_err(|err| SchemeError::InvalidTableAttributes(Some(err)))?;
        }

        let mut seen = HashSet::new();
        for attribute in &scheme.attributes {
            if !seen.insert(attribute.name.as_str()) {
                return Err(SchemeError::InvalidTableAttributes(Some(
                    AttributeError::Duplicate(attribute.name.clone()),
                )));
            }
        }

        Ok(())
    }

    fn does_row_fit_table(&self, table: &Table, row: &Row) -> bool {
        if table.attributes.len() != row.value.len() {
            return false;
        }

        table
            .attributes
            .iter()
            .zip(&row.value)
            .all(|(attribute, value)| {
                self.types
                    .get(&attribute.data_type)
                    .map(|t| t.is_valid_value(value))
                    .unwrap_or(false)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{IntegerType, PatternType};

    fn validation() -> DatabaseValidation {
        let types = TypeRegistry::new()
            .register("someType", PatternType::new("^-*[0-9]+$").unwrap())
            .register("integer", IntegerType);
        DatabaseValidation::new(types)
    }

    fn some_table() -> Table {
        Table::from_scheme(TableScheme::new("testTable", Vec::new()).attribute("firstAttribute", "someType"))
    }

    #[test]
    fn test_valid_database_names() {
        let v = validation();
        assert!(v.is_valid_database_name("shop"));
        assert!(v.is_valid_database_name("my database"));
        assert!(v.is_valid_database_name("données-2024"));
        assert!(v.is_valid_database_name("a.b"));
    }

    #[test]
    fn test_invalid_database_names() {
        let v = validation();
        assert!(!v.is_valid_database_name(""));
        assert!(!v.is_valid_database_name(" "));
        assert!(!v.is_valid_database_name("\t\n"));
        assert!(!v.is_valid_database_name("foo/bar"));
        assert!(!v.is_valid_database_name("nul\0byte"));
        assert!(!v.is_valid_database_name(".."));
        assert!(!v.is_valid_database_name("."));
    }

    #[cfg(windows)]
    #[test]
    fn test_invalid_windows_names() {
        let v = validation();
        for name in ["a:b", "a*b", "a?b", "a|b", "a\\b", "a<b", "a\"b"] {
            assert!(!v.is_valid_database_name(name), "{}", name);
        }
    }

    #[test]
    fn test_scheme_invalid_table_name() {
        let v = validation();
        for name in ["", " ", "a/b"] {
            let scheme = TableScheme::new(name, vec![Attribute::new("testAttribute", "someType")]);
            assert_eq!(
                v.check_table_scheme(&scheme),
                Err(SchemeError::InvalidTableName(name.to_string()))
            );
        }
    }

    #[test]
    fn test_scheme_without_attributes() {
        let scheme = TableScheme::new("testTable", Vec::new());
        assert_eq!(
            validation().check_table_scheme(&scheme),
            Err(SchemeError::InvalidTableAttributes(None))
        );
    }

    #[test]
    fn test_scheme_error_display() {
        assert_eq!(
            SchemeError::InvalidTableAttributes(None).to_string(),
            "Table scheme has invalid attributes: none given"
        );
        assert_eq!(
            SchemeError::InvalidTableAttributes(Some(AttributeError::Duplicate("x".into())))
                .to_string(),
            "Table scheme has invalid attributes: Attribute name 'x' is not unique"
        );
    }

    #[test]
    fn test_scheme_invalid_attribute_name() {
        let v = validation();
        for name in ["", " ", "a/b"] {
            let scheme = TableScheme::new("testTable", vec![Attribute::new(name, "someType")]);
            assert!(matches!(
                v.check_table_scheme(&scheme),
                Err(SchemeError::InvalidTableAttributes(Some(AttributeError::InvalidName(_))))
            ));
        }
    }

    #[test]
    fn test_scheme_unknown_attribute_type() {
        let scheme = TableScheme::new("testTable", Vec::new())
            .attribute("ok", "someType")
            .attribute("bad", "bogus");
        assert_eq!(
            validation().check_table_scheme(&scheme),
            Err(SchemeError::InvalidTableAttributes(Some(AttributeError::UnknownType {
                name: "bad".into(),
                data_type: "bogus".into(),
            })))
        );
    }

    #[test]
    fn test_scheme_duplicate_attribute() {
        let scheme = TableScheme::new("testTable", Vec::new())
            .attribute("x", "someType")
            .attribute("x", "integer");
        assert_eq!(
            validation().check_table_scheme(&scheme),
            Err(SchemeError::InvalidTableAttributes(Some(AttributeError::Duplicate("x".into()))))
        );
    }

    #[test]
    fn test_scheme_checks_run_in_order() {
        // invalid name wins over missing attributes
        let scheme = TableScheme::new("", Vec::new());
        assert!(matches!(
            validation().check_table_scheme(&scheme),
            Err(SchemeError::InvalidTableName(_))
        ));

        // an unknown type is reported before a later duplicate
        let scheme = TableScheme::new("t", Vec::new())
            .attribute("x", "bogus")
            .attribute("x", "someType");
        assert!(matches!(
            validation().check_table_scheme(&scheme),
            Err(SchemeError::InvalidTableAttributes(Some(AttributeError::UnknownType { .. })))
        ));
    }

    #[test]
    fn test_valid_scheme() {
        let scheme = TableScheme::new("testTable", vec![Attribute::new("testAttribute", "someType")]);
        assert!(validation().check_table_scheme(&scheme).is_ok());
    }

    #[test]
    fn test_row_fit() {
        let v = validation();
        let table = some_table();

        assert!(!v.does_row_fit_table(&table, &Row::new(vec!["1234sometext".into()])));
        assert!(v.does_row_fit_table(&table, &Row::new(vec!["1".into()])));
        assert!(!v.does_row_fit_table(&table, &Row::new(vec!["1".into(), "2".into()])));
        assert!(!v.does_row_fit_table(&table, &Row::new(Vec::new())));
    }

    #[test]
    fn test_row_fit_unregistered_type() {
        let mut table = some_table();
        table.attributes[0].data_type = "gone".into();
        assert!(!validation().does_row_fit_table(&table, &Row::new(vec!["1".into()])));
    }
}
