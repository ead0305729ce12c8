//! Cell data types
//!
//! Every column has a type name that must be registered in a [`TypeRegistry`].
//! A registered type knows whether a string is a legal cell value and what
//! value a freshly created cell starts with.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{Attribute, Row};
use crate::config::{ConfigError, DataTypeConfig};

/// A column type capability
pub trait DataType: Send + Sync + fmt::Debug {
    /// Whether `value` is a legal cell of this type
    fn is_valid_value(&self, value: &str) -> bool;

    /// Value used for a new, unfilled cell
    fn default_value(&self) -> &str;
}

/// Exactly one character
#[derive(Debug, Clone, Copy, Default)]
pub struct CharType;

impl DataType for CharType {
    fn is_valid_value(&self, value: &str) -> bool {
        let mut chars = value.chars();
        chars.next().is_some() && chars.next().is_none()
    }

    fn default_value(&self) -> &str {
        ""
    }
}

/// A 32-bit signed integer
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerType;

impl DataType for IntegerType {
    fn is_valid_value(&self, value: &str) -> bool {
        value.parse::<i32>().is_ok()
    }

    fn default_value(&self) -> &str {
        "0"
    }
}

/// A 64-bit float, exponent notation included
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleType;

impl DataType for DoubleType {
    fn is_valid_value(&self, value: &str) -> bool {
        value.parse::<f64>().is_ok()
    }

    fn default_value(&self) -> &str {
        "0.0"
    }
}

/// Integer numeral used inside complex literals
const INTEGER_NUMERAL: &str = r"\d";

/// Decimal numeral used inside complex literals
const DOUBLE_NUMERAL: &str = r"\d*(?:\.\d+)?";

/// A complex literal such as `3+4i`, `-2.5i` or the bare `i`
#[derive(Debug, Clone)]
pub struct ComplexType {
    regex: Regex,
}

impl ComplexType {
    fn with_numeral(numeral: &str) -> Result<Self, regex::Error> {
        let pattern = format!(r"^[+-]?((?:{n})*[+-])?(?:{n})*i$", n = numeral);
        Ok(Self {
            regex: Regex::new(&pattern)?,
        })
    }

    /// Complex number with integer coefficients
    pub fn integer() -> Result<Self, regex::Error> {
        Self::with_numeral(INTEGER_NUMERAL)
    }

    /// Complex number with decimal coefficients
    pub fn double() -> Result<Self, regex::Error> {
        Self::with_numeral(DOUBLE_NUMERAL)
    }
}

impl DataType for ComplexType {
    fn is_valid_value(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    fn default_value(&self) -> &str {
        "i"
    }
}

/// A user-defined type matched by a regular expression
#[derive(Debug, Clone)]
pub struct PatternType {
    regex: Regex,
}

impl PatternType {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl DataType for PatternType {
    fn is_valid_value(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    fn default_value(&self) -> &str {
        ""
    }
}

/// Mapping from type name to its implementation
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, Arc<dyn DataType>>,
}

impl TypeRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured type definitions
    pub fn from_config(config: &BTreeMap<String, DataTypeConfig>) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (name, def) in config {
            let built: Result<Arc<dyn DataType>, regex::Error> = match def {
                DataTypeConfig::Char => Ok(Arc::new(CharType)),
                DataTypeConfig::Integer => Ok(Arc::new(IntegerType)),
                DataTypeConfig::Double => Ok(Arc::new(DoubleType)),
                DataTypeConfig::ComplexInteger => ComplexType::integer().map(|t| Arc::new(t) as _),
                DataTypeConfig::ComplexDouble => ComplexType::double().map(|t| Arc::new(t) as _),
                DataTypeConfig::Pattern { regex } => PatternType::new(regex).map(|t| Arc::new(t) as _),
            };
            let data_type = built.map_err(|source| ConfigError::InvalidPattern {
                name: name.clone(),
                source,
            })?;
            registry.types.insert(name.clone(), data_type);
        }
        Ok(registry)
    }

    /// Register a type under `name`, replacing any previous one
    pub fn register(mut self, name: impl Into<String>, data_type: impl DataType + 'static) -> Self {
        self.types.insert(name.into(), Arc::new(data_type));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn DataType> {
        self.types.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// A row of default cell values for the given columns
    ///
    /// Columns of unregistered types get an empty cell.
    pub fn default_row(&self, attributes: &[Attribute]) -> Row {
        let value = attributes
            .iter()
            .map(|a| {
                self.get(&a.data_type)
                    .map(|t| t.default_value().to_string())
                    .unwrap_or_default()
            })
            .collect();
        Row::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char() {
        assert!(CharType.is_valid_value("a"));
        assert!(CharType.is_valid_value("ж"));
        assert!(!CharType.is_valid_value(""));
        assert!(!CharType.is_valid_value("ab"));
    }

    #[test]
    fn test_integer() {
        assert!(IntegerType.is_valid_value("10"));
        assert!(IntegerType.is_valid_value("-2147483648"));
        assert!(!IntegerType.is_valid_value("2147483648"));
        assert!(!IntegerType.is_valid_value("1.5"));
        assert!(!IntegerType.is_valid_value("ten"));
    }

    #[test]
    fn test_double() {
        assert!(DoubleType.is_valid_value("1.5"));
        assert!(DoubleType.is_valid_value("-3"));
        assert!(DoubleType.is_valid_value("6.02e23"));
        assert!(!DoubleType.is_valid_value("1,5"));
        assert!(!DoubleType.is_valid_value(""));
    }

    #[test]
    fn test_complex_integer() {
        let t = ComplexType::integer().unwrap();
        assert!(t.is_valid_value("i"));
        assert!(t.is_valid_value("3+4i"));
        assert!(t.is_valid_value("-12-7i"));
        assert!(t.is_valid_value("+5i"));
        assert!(!t.is_valid_value("3.5+4i"));
        assert!(!t.is_valid_value("3+4"));
        assert!(!t.is_valid_value(""));
    }

    #[test]
    fn test_complex_double() {
        let t = ComplexType::double().unwrap();
        assert!(t.is_valid_value("i"));
        assert!(t.is_valid_value("3.5+4.25i"));
        assert!(t.is_valid_value("-0.5i"));
        assert!(!t.is_valid_value("3.5+4.25"));
        assert!(!t.is_valid_value("abc"));
    }

    #[test]
    fn test_defaults_are_valid() {
        let t = ComplexType::double().unwrap();
        assert!(t.is_valid_value(t.default_value()));
        assert!(IntegerType.is_valid_value(IntegerType.default_value()));
        assert!(DoubleType.is_valid_value(DoubleType.default_value()));
    }

    #[test]
    fn test_registry_from_config() {
        let mut config = BTreeMap::new();
        config.insert("integer".to_string(), DataTypeConfig::Integer);
        config.insert(
            "someType".to_string(),
            DataTypeConfig::Pattern {
                regex: "^-*[0-9]+$".into(),
            },
        );

        let registry = TypeRegistry::from_config(&config).unwrap();
        assert!(registry.contains("integer"));
        assert!(registry.get("someType").unwrap().is_valid_value("--12"));
        assert!(!registry.get("someType").unwrap().is_valid_value("1234sometext"));
        assert!(registry.get("char").is_none());
    }

    #[test]
    fn test_registry_rejects_bad_pattern() {
        let mut config = BTreeMap::new();
        config.insert(
            "broken".to_string(),
            DataTypeConfig::Pattern { regex: "(".into() },
        );
        assert!(TypeRegistry::from_config(&config).is_err());
    }

    #[test]
    fn test_default_row() {
        let registry = TypeRegistry::new()
            .register("integer", IntegerType)
            .register("complexInteger", ComplexType::integer().unwrap());
        let attributes = vec![
            Attribute::new("qty", "integer"),
            Attribute::new("z", "complexInteger"),
            Attribute::new("other", "unknown"),
        ];

        let row = registry.default_row(&attributes);
        assert_eq!(row.value, vec!["0", "i", ""]);
    }
}
