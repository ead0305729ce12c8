//! Data model
//!
//! A [`Database`] is a named set of [`Table`]s. A table has an ordered list
//! of typed [`Attribute`]s (its columns), a map of row id to [`Row`], and a
//! counter handing out row ids. Row values are strings aligned by position
//! with the table's attributes.
//!
//! Tables are stored as JSON files under `/{database}/tables/`.

pub mod types;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Identifier of a row within its table
pub type RowId = u64;

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    /// Name of a type registered in the type registry
    #[serde(rename = "type")]
    pub data_type: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// One record of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Assigned by the database when the row is added
    #[serde(default)]
    pub id: RowId,
    /// Cell values, `value[i]` belongs to `attributes[i]`
    #[serde(default)]
    pub value: Vec<String>,
}

impl Row {
    /// A row that has not been stored yet
    pub fn new(value: Vec<String>) -> Self {
        Self { id: 0, value }
    }

    pub fn with_id(id: RowId, value: Vec<String>) -> Self {
        Self { id, value }
    }
}

/// A request to create a table, validated before the table exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableScheme {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl TableScheme {
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// Add an attribute
    pub fn attribute(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, data_type));
        self
    }
}

/// A table: schema, rows and the next row id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// Next id handed out by [`Table::insert_row`]; never decreases
    #[serde(default)]
    pub next_row_id: RowId,
    #[serde(default)]
    pub rows: BTreeMap<RowId, Row>,
}

impl Table {
    /// A fresh, empty table for a scheme
    pub fn from_scheme(scheme: TableScheme) -> Self {
        Self {
            name: scheme.name,
            attributes: scheme.attributes,
            next_row_id: 0,
            rows: BTreeMap::new(),
        }
    }

    /// Store `row` under the next id and return that id
    ///
    /// Any id already set on `row` is overwritten.
    pub fn insert_row(&mut self, mut row: Row) -> RowId {
        let id = self.next_row_id;
        row.id = id;
        self.rows.insert(id, row);
        self.next_row_id += 1;
        id
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.get(&id)
    }

    /// Position of the attribute called `name`
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// A copy of this table restricted to the requested columns
    ///
    /// Columns keep their order in the schema, not the order they were
    /// requested in. Returns the first requested name that is not a column.
    pub fn project<S: AsRef<str>>(&self, attribute_names: &[S]) -> Result<Table, String> {
        if let Some(missing) = attribute_names
            .iter()
            .map(AsRef::as_ref)
            .find(|name| self.attribute_index(name).is_none())
        {
            return Err(missing.to_string());
        }

        let requested: HashSet<&str> = attribute_names.iter().map(AsRef::as_ref).collect();
        let kept: Vec<usize> = self
            .attributes
            .iter()
            .enumerate()
            .filter(|(_, a)| requested.contains(a.name.as_str()))
            .map(|(i, _)| i)
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|(id, row)| {
                let value = kept
                    .iter()
                    .filter_map(|&i| row.value.get(i).cloned())
                    .collect();
                (*id, Row::with_id(row.id, value))
            })
            .collect();

        Ok(Table {
            name: self.name.clone(),
            attributes: kept.iter().map(|&i| self.attributes[i].clone()).collect(),
            next_row_id: self.next_row_id,
            rows,
        })
    }
}

/// A named collection of tables
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
}

impl Database {
    /// An empty database
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: BTreeMap::new(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Table names, sorted
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}
