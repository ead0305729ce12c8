//! Database service
//!
//! Orchestrates validation and storage. Each operation checks its arguments,
//! then existence preconditions, then validity, and only then touches disk.
//! Missing leaves are not errors on reads: [`DatabaseService::get_table`]
//! returns `None` for a missing table but fails with
//! [`Error::DatabaseNotFound`] when the database itself is missing.

pub mod locks;

use crate::config::{ConfigError, Settings};
use crate::error::{Error, Result};
use crate::schema::{Database, Row, RowId, Table, TableScheme};
use crate::storage::DbRepository;
use crate::validation::{DatabaseValidation, Validation};

use self::locks::DatabaseLocks;

/// Create/read/update/delete operations over databases, tables and rows
#[derive(Debug)]
pub struct DatabaseService<V = DatabaseValidation> {
    repository: DbRepository,
    validation: V,
    locks: DatabaseLocks,
}

fn guard_not_empty(value: &str, name: &'static str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument {
            name,
            reason: "must not be empty",
        });
    }
    Ok(())
}

impl DatabaseService {
    /// Service validating against the types configured in `settings`
    pub fn new(settings: Settings) -> std::result::Result<Self, ConfigError> {
        settings.check()?;
        let validation = DatabaseValidation::new(settings.type_registry()?);
        Ok(Self::with_validation(settings, validation))
    }
}

impl<V: Validation> DatabaseService<V> {
    /// Service with a custom validation
    pub fn with_validation(settings: Settings, validation: V) -> Self {
        Self {
            repository: DbRepository::new(settings),
            validation,
            locks: DatabaseLocks::new(),
        }
    }

    pub fn validation(&self) -> &V {
        &self.validation
    }

    pub fn settings(&self) -> &Settings {
        self.repository.settings()
    }

    // =========================================================================
    // Databases
    // =========================================================================

    pub async fn create_database(&self, name: &str) -> Result<()> {
        guard_not_empty(name, "dbName")?;

        if !self.validation.is_valid_database_name(name) {
            return Err(Error::InvalidDatabaseName {
                name: name.to_string(),
            });
        }

        let _guard = self.locks.lock(name).await;

        if self.repository.exists(name).await? {
            return Err(Error::DatabaseAlreadyExists {
                name: name.to_string(),
            });
        }

        self.repository.create(&Database::new(name)).await?;
        tracing::info!("Created database '{}'", name);
        Ok(())
    }

    pub async fn drop_database(&self, name: &str) -> Result<()> {
        guard_not_empty(name, "dbName")?;
        let _guard = self.locks.lock(name).await;

        if !self.repository.exists(name).await? {
            return Err(Error::DatabaseNotFound {
                name: name.to_string(),
            });
        }

        self.repository.delete(name).await?;
        tracing::info!("Dropped database '{}'", name);
        Ok(())
    }

    /// Load a database with all its tables, `None` if it does not exist
    pub async fn get_database(&self, name: &str) -> Result<Option<Database>> {
        guard_not_empty(name, "dbName")?;
        tracing::debug!("Loading database '{}'", name);
        Ok(self.repository.get_by_name(name).await?)
    }

    /// Names of all databases, sorted
    pub async fn get_database_names(&self) -> Result<Vec<String>> {
        Ok(self.repository.get_all_names().await?)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    pub async fn create_table(&self, db_name: &str, scheme: TableScheme) -> Result<()> {
        guard_not_empty(db_name, "dbName")?;
        let _guard = self.locks.lock(db_name).await;

        let mut database = self.require_database(db_name).await?;

        self.validation.check_table_scheme(&scheme)?;

        if database.tables.contains_key(&scheme.name) {
            return Err(Error::TableAlreadyExists {
                database: db_name.to_string(),
                table: scheme.name,
            });
        }

        let table = Table::from_scheme(scheme);
        let table_name = table.name.clone();
        database.tables.insert(table_name.clone(), table);
        self.repository.update(&database).await?;

        tracing::info!("Created table '{}' in database '{}'", table_name, db_name);
        Ok(())
    }

    pub async fn drop_table(&self, db_name: &str, table_name: &str) -> Result<()> {
        guard_not_empty(db_name, "dbName")?;
        guard_not_empty(table_name, "tableName")?;
        let _guard = self.locks.lock(db_name).await;

        let mut database = self.require_database(db_name).await?;

        if database.tables.remove(table_name).is_none() {
            return Err(Error::TableNotFound {
                database: db_name.to_string(),
                table: table_name.to_string(),
            });
        }

        self.repository.update(&database).await?;
        tracing::info!("Dropped table '{}' from database '{}'", table_name, db_name);
        Ok(())
    }

    /// Load a table, `None` if the database has no such table
    pub async fn get_table(&self, db_name: &str, table_name: &str) -> Result<Option<Table>> {
        guard_not_empty(db_name, "dbName")?;
        guard_not_empty(table_name, "tableName")?;

        if !self.repository.exists(db_name).await? {
            return Err(Error::DatabaseNotFound {
                name: db_name.to_string(),
            });
        }

        tracing::debug!("Loading table '{}' of database '{}'", table_name, db_name);
        Ok(self.repository.get_table(db_name, table_name).await?)
    }

    /// A table restricted to the named attributes
    ///
    /// Attributes keep their order in the table's schema, whatever order
    /// they are requested in. `None` if the database has no such table.
    pub async fn get_table_projection<S: AsRef<str>>(
        &self,
        db_name: &str,
        table_name: &str,
        attribute_names: &[S],
    ) -> Result<Option<Table>> {
        guard_not_empty(db_name, "dbName")?;
        guard_not_empty(table_name, "tableName")?;
        if attribute_names.is_empty() {
            return Err(Error::InvalidArgument {
                name: "attributeNames",
                reason: "must not be empty",
            });
        }

        let Some(table) = self.get_table(db_name, table_name).await? else {
            return Ok(None);
        };

        table
            .project(attribute_names)
            .map(Some)
            .map_err(|attribute| Error::AttributeNotFound {
                table: table_name.to_string(),
                attribute,
            })
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Add a row under a fresh id and return it as stored
    ///
    /// The id carried by `row` is ignored.
    pub async fn add_row(&self, db_name: &str, table_name: &str, row: Row) -> Result<Row> {
        guard_not_empty(db_name, "dbName")?;
        guard_not_empty(table_name, "tableName")?;
        let _guard = self.locks.lock(db_name).await;

        let mut table = self.require_table(db_name, table_name).await?;

        if !self.validation.does_row_fit_table(&table, &row) {
            return Err(Error::InvalidRow {
                table: table_name.to_string(),
            });
        }

        let id = table.insert_row(row);
        let stored = table.rows[&id].clone();
        self.repository.put_table(db_name, &table).await?;

        tracing::info!("Added row {} to table '{}' of database '{}'", id, table_name, db_name);
        Ok(stored)
    }

    /// Replace the row with the same id
    pub async fn update_row(&self, db_name: &str, table_name: &str, row: Row) -> Result<()> {
        guard_not_empty(db_name, "dbName")?;
        guard_not_empty(table_name, "tableName")?;
        let _guard = self.locks.lock(db_name).await;

        let mut table = self.require_table(db_name, table_name).await?;

        if !table.rows.contains_key(&row.id) {
            return Err(Error::RowNotFound {
                table: table_name.to_string(),
                id: row.id,
            });
        }

        if !self.validation.does_row_fit_table(&table, &row) {
            return Err(Error::InvalidRow {
                table: table_name.to_string(),
            });
        }

        let id = row.id;
        table.rows.insert(id, row);
        self.repository.put_table(db_name, &table).await?;

        tracing::info!("Updated row {} of table '{}' in database '{}'", id, table_name, db_name);
        Ok(())
    }

    /// Remove a row; its id is never handed out again
    pub async fn delete_row(&self, db_name: &str, table_name: &str, row_id: RowId) -> Result<()> {
        guard_not_empty(db_name, "dbName")?;
        guard_not_empty(table_name, "tableName")?;
        let _guard = self.locks.lock(db_name).await;

        let mut table = self.require_table(db_name, table_name).await?;

        if table.rows.remove(&row_id).is_none() {
            return Err(Error::RowNotFound {
                table: table_name.to_string(),
                id: row_id,
            });
        }

        self.repository.put_table(db_name, &table).await?;
        tracing::info!("Deleted row {} from table '{}' of database '{}'", row_id, table_name, db_name);
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn require_database(&self, name: &str) -> Result<Database> {
        self.repository
            .get_by_name(name)
            .await?
            .ok_or_else(|| Error::DatabaseNotFound {
                name: name.to_string(),
            })
    }

    async fn require_table(&self, db_name: &str, table_name: &str) -> Result<Table> {
        self.get_table(db_name, table_name)
            .await?
            .ok_or_else(|| Error::TableNotFound {
                database: db_name.to_string(),
                table: table_name.to_string(),
            })
    }
}
