//! Database repository - reads and writes databases on disk
//!
//! A database exists exactly when its directory exists. Its tables are the
//! files in the tables subdirectory whose names follow the configured file
//! name format. Whole tables are read and written at once; writes go to a
//! temporary sibling file that is then renamed over the target.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use walkdir::WalkDir;

use super::{StorageError, StorageResult};
use crate::config::Settings;
use crate::schema::{Database, Table};
use crate::validation::is_valid_file_name;

/// Prefix of in-flight table files, never listed as tables
const TEMP_FILE_PREFIX: &str = ".tmp-";

/// Sequence number keeping concurrent temporary file names apart
static TEMP_FILE_SEQ: AtomicU64 = AtomicU64::new(0);

/// File-system backed store of databases
#[derive(Debug, Clone)]
pub struct DbRepository {
    settings: Settings,
}

fn guard_name(name: &str, argument: &'static str) -> StorageResult<()> {
    if name.is_empty() {
        return Err(StorageError::InvalidArgument {
            name: argument,
            reason: "must not be empty",
        });
    }
    Ok(())
}

impl DbRepository {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Directory of the database called `name`
    ///
    /// `None` when `name` is not a single path segment, such a database
    /// can never exist.
    pub fn database_path(&self, name: &str) -> Option<PathBuf> {
        is_valid_file_name(name).then(|| self.settings.storage_path.join(name))
    }

    fn tables_path(&self, db_path: &Path) -> PathBuf {
        db_path.join(&self.settings.tables_directory_name)
    }

    fn table_path(&self, db_path: &Path, table_name: &str) -> Option<PathBuf> {
        is_valid_file_name(table_name).then(|| {
            self.tables_path(db_path)
                .join(self.settings.table_file_name(table_name))
        })
    }

    /// Whether a database called `name` exists
    pub async fn exists(&self, name: &str) -> StorageResult<bool> {
        guard_name(name, "dbName")?;
        match self.database_path(name) {
            Some(path) => is_dir(&path).await,
            None => Ok(false),
        }
    }

    /// Create a database with all of its tables
    pub async fn create(&self, database: &Database) -> StorageResult<()> {
        guard_name(&database.name, "database.name")?;
        let db_path = self
            .database_path(&database.name)
            .ok_or(StorageError::InvalidArgument {
                name: "database.name",
                reason: "is not a valid file name",
            })?;

        if is_dir(&db_path).await? {
            return Err(StorageError::AlreadyExists {
                name: database.name.clone(),
            });
        }

        let tables_path = self.tables_path(&db_path);
        fs::create_dir_all(&tables_path)
            .await
            .map_err(StorageError::io(&tables_path))?;

        for table in database.tables.values() {
            self.put_table_at(&db_path, table).await?;
        }

        tracing::debug!("Created database directory {:?}", db_path);
        Ok(())
    }

    /// Remove a database and everything in it
    ///
    /// Removing a database that does not exist is not an error.
    pub async fn delete(&self, name: &str) -> StorageResult<()> {
        guard_name(name, "dbName")?;
        let Some(db_path) = self.database_path(name) else {
            return Ok(());
        };

        if !is_dir(&db_path).await? {
            return Ok(());
        }

        fs::remove_dir_all(&db_path)
            .await
            .map_err(StorageError::io(&db_path))?;

        tracing::debug!("Removed database directory {:?}", db_path);
        Ok(())
    }

    /// Load a database with all of its tables
    pub async fn get_by_name(&self, name: &str) -> StorageResult<Option<Database>> {
        guard_name(name, "dbName")?;
        let Some(db_path) = self.database_path(name) else {
            return Ok(None);
        };

        if !is_dir(&db_path).await? {
            return Ok(None);
        }

        let mut database = Database::new(name);
        for table_name in self.table_names_at(&db_path) {
            if let Some(path) = self.table_path(&db_path, &table_name) {
                if let Some(table) = read_table(&path).await? {
                    database.tables.insert(table_name, table);
                }
            }
        }

        Ok(Some(database))
    }

    /// Names of all databases, sorted
    ///
    /// Empty when the storage root does not exist yet.
    pub async fn get_all_names(&self) -> StorageResult<Vec<String>> {
        let root = &self.settings.storage_path;
        if !is_dir(root).await? {
            return Ok(Vec::new());
        }

        let names = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();

        Ok(names)
    }

    /// Overwrite an existing database
    ///
    /// Every table is rewritten and files of tables that are no longer part
    /// of the database are removed. Fails if the database does not exist.
    pub async fn update(&self, database: &Database) -> StorageResult<()> {
        guard_name(&database.name, "database.name")?;
        let db_path = match self.database_path(&database.name) {
            Some(path) if is_dir(&path).await? => path,
            _ => {
                return Err(StorageError::NotFound {
                    name: database.name.clone(),
                })
            }
        };

        let tables_path = self.tables_path(&db_path);
        fs::create_dir_all(&tables_path)
            .await
            .map_err(StorageError::io(&tables_path))?;

        for table in database.tables.values() {
            self.put_table_at(&db_path, table).await?;
        }

        for stale in self
            .table_names_at(&db_path)
            .into_iter()
            .filter(|name| !database.tables.contains_key(name))
        {
            if let Some(path) = self.table_path(&db_path, &stale) {
                remove_file_if_exists(&path).await?;
                tracing::debug!("Removed table file {:?}", path);
            }
        }

        Ok(())
    }

    /// Names of the tables of a database, sorted
    ///
    /// Empty when the database does not exist.
    pub async fn table_names(&self, db_name: &str) -> StorageResult<Vec<String>> {
        guard_name(db_name, "dbName")?;
        Ok(self
            .database_path(db_name)
            .map(|path| self.table_names_at(&path))
            .unwrap_or_default())
    }

    /// Load a single table
    pub async fn get_table(&self, db_name: &str, table_name: &str) -> StorageResult<Option<Table>> {
        guard_name(db_name, "dbName")?;
        guard_name(table_name, "tableName")?;

        let path = self
            .database_path(db_name)
            .and_then(|db_path| self.table_path(&db_path, table_name));
        match path {
            Some(path) => read_table(&path).await,
            None => Ok(None),
        }
    }

    /// Write a single table of an existing database
    pub async fn put_table(&self, db_name: &str, table: &Table) -> StorageResult<()> {
        guard_name(db_name, "dbName")?;
        let db_path = match self.database_path(db_name) {
            Some(path) if is_dir(&path).await? => path,
            _ => {
                return Err(StorageError::NotFound {
                    name: db_name.to_string(),
                })
            }
        };

        self.put_table_at(&db_path, table).await
    }

    async fn put_table_at(&self, db_path: &Path, table: &Table) -> StorageResult<()> {
        let path = self
            .table_path(db_path, &table.name)
            .ok_or(StorageError::InvalidArgument {
                name: "table.name",
                reason: "is not a valid file name",
            })?;

        let json = serde_json::to_vec_pretty(table).map_err(|source| StorageError::Serialize {
            table: table.name.clone(),
            source,
        })?;

        write_atomic(&path, &json).await?;
        tracing::debug!("Wrote table file {:?}", path);
        Ok(())
    }

    fn table_names_at(&self, db_path: &Path) -> Vec<String> {
        let tables_path = self.tables_path(db_path);
        if !tables_path.is_dir() {
            return Vec::new();
        }

        WalkDir::new(&tables_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| !e.file_name().to_string_lossy().starts_with(TEMP_FILE_PREFIX))
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|f| self.settings.table_name_from_file(f))
            })
            .collect()
    }
}

async fn is_dir(path: &Path) -> StorageResult<bool> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

async fn read_table(path: &Path) -> StorageResult<Option<Table>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let table = serde_json::from_str(&content).map_err(|source| StorageError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(table))
}

/// Write `content` to a short sibling file, then rename it over `path`
///
/// The temporary name does not grow with the target's, so any table file
/// name the host accepts can be written. It is removed again when the write
/// does not complete.
async fn write_atomic(path: &Path, content: &[u8]) -> StorageResult<()> {
    let seq = TEMP_FILE_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp_path = path.with_file_name(format!(
        "{}{}-{}",
        TEMP_FILE_PREFIX,
        std::process::id(),
        seq
    ));

    let result = match fs::write(&tmp_path, content).await {
        Ok(()) => fs::rename(&tmp_path, path)
            .await
            .map_err(StorageError::io(path)),
        Err(e) => Err(StorageError::Io {
            path: tmp_path.clone(),
            source: e,
        }),
    };

    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp_path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Failed to remove temporary file {:?}: {}", tmp_path, e);
            }
        }
    }
    result
}

async fn remove_file_if_exists(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
