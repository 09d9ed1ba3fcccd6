//! Database container managing the table registry and snapshot persistence.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use arc_swap::{ArcSwap, ArcSwapOption};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::DbConfig;
use crate::error::DbError;
use crate::persistence::{SnapshotStore, CATALOG_FILE};
use crate::table::{Table, TableHandle};

/// Map of table name to shared table handle.
pub(crate) type TableRegistry = DashMap<String, TableHandle>;

/// Database container holding all tables.
///
/// Table creation and lookup go through a concurrent map, so operations on
/// different tables never contend on a shared lock. `load` swaps in a whole
/// new registry at once; handles obtained before the swap keep pointing at
/// the tables they were issued for.
#[derive(Debug)]
pub struct Database {
    /// Map of table name to table instance
    tables: ArcSwap<TableRegistry>,
    /// Directory used by the most recent load or save
    folder: ArcSwap<PathBuf>,
    /// Completion time of the last successful save
    last_save: ArcSwapOption<SystemTime>,
    /// Held for the duration of a save so concurrent saves do not interleave
    save_lock: Mutex<()>,
    config: DbConfig,
}

impl Database {
    /// Creates a new empty database with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DbConfig::default())
    }

    /// Creates a new empty database with the given configuration.
    pub fn with_config(config: DbConfig) -> Self {
        Self {
            tables: ArcSwap::from_pointee(DashMap::new()),
            folder: ArcSwap::from_pointee(config.data_dir.clone()),
            last_save: ArcSwapOption::empty(),
            save_lock: Mutex::new(()),
            config,
        }
    }

    /// Returns the database configuration.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Creates a new empty table.
    ///
    /// # Arguments
    /// * `name` - Table name, also used as the snapshot file stem
    ///
    /// # Returns
    /// `Result<(), DbError>` failing with `TableAlreadyExists` if the name is
    /// taken. Concurrent creations of the same name have exactly one winner.
    pub fn create_table(&self, name: impl Into<String>) -> Result<(), DbError> {
        let name = name.into();
        validate_table_name(&name)?;

        let registry = self.tables.load();
        // Bound to a local so the entry guard drops before `registry`
        let result = match registry.entry(name.clone()) {
            Entry::Occupied(_) => Err(DbError::TableAlreadyExists(name)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Table::new(name.clone())));
                tracing::debug!("Created table '{}'", name);
                Ok(())
            }
        };
        result
    }

    /// Gets a shared handle to a table by name.
    ///
    /// # Returns
    /// `Result<TableHandle, DbError>` failing with `TableNotFound` for
    /// unknown names.
    pub fn get_table(&self, name: &str) -> Result<TableHandle, DbError> {
        self.tables
            .load()
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| DbError::TableNotFound {
                table: name.to_string(),
            })
    }

    /// Returns all table names in ascending order.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .load()
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Returns the number of tables in the database.
    pub fn table_count(&self) -> usize {
        self.tables.load().len()
    }

    /// Returns the directory used by the most recent load or save.
    pub fn folder(&self) -> PathBuf {
        PathBuf::clone(&self.folder.load())
    }

    /// Returns when the last successful save completed, if any.
    pub fn last_save(&self) -> Option<SystemTime> {
        self.last_save.load().as_deref().copied()
    }

    /// Replaces every table with the snapshot stored in `dir`.
    ///
    /// Reads the catalog and every table file before touching the registry;
    /// on any failure the database is left exactly as it was.
    ///
    /// # Returns
    /// `Result<(), DbError>` with `IoError` for missing or unreadable files,
    /// `DecodeError` for malformed JSON and `InvalidPayload` for duplicate ids.
    pub fn load(&self, dir: impl AsRef<Path>) -> Result<(), DbError> {
        let dir = dir.as_ref().to_path_buf();
        let store = SnapshotStore::new(&dir, &self.config);
        let registry = store.load_tables()?;
        let table_count = registry.len();

        self.tables.store(Arc::new(registry));
        self.folder.store(Arc::new(dir));

        tracing::info!(
            "Loaded {} tables from {}",
            table_count,
            store.dir().display()
        );
        Ok(())
    }

    /// Writes every table to the directory recorded by the last load.
    ///
    /// Every table is attempted; failures are returned together as
    /// `SaveFailed`. The catalog (`master.json`) is rewritten only when all
    /// table files were written.
    pub fn save(&self) -> Result<(), DbError> {
        let dir = self.folder();
        self.save_into(&dir)
    }

    /// Writes every table to `dir` and records it as the snapshot directory.
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<(), DbError> {
        let dir = dir.as_ref().to_path_buf();
        self.save_into(&dir)?;
        self.folder.store(Arc::new(dir));
        Ok(())
    }

    fn save_into(&self, dir: &Path) -> Result<(), DbError> {
        let _guard = self.save_lock.lock().map_err(|_| DbError::LockPoisoned)?;
        let store = SnapshotStore::new(dir, &self.config);
        let tables = self.tables_snapshot();
        store.save_tables(&tables, self.config.write_catalog)?;
        self.last_save.store(Some(Arc::new(SystemTime::now())));
        Ok(())
    }

    /// Returns `(name, handle)` pairs for every table, ordered by name.
    pub(crate) fn tables_snapshot(&self) -> Vec<(String, TableHandle)> {
        let mut tables: Vec<(String, TableHandle)> = self
            .tables
            .load()
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        tables.sort_by(|a, b| a.0.cmp(&b.0));
        tables
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that a table name maps to a file directly inside the snapshot
/// directory without colliding with the catalog.
pub(crate) fn validate_table_name(name: &str) -> Result<(), DbError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name == "." || name == ".." {
        "name is a relative path component"
    } else if name.contains(['/', '\\']) || name.contains(std::path::MAIN_SEPARATOR) {
        "name contains a path separator"
    } else if name.contains('\0') {
        "name contains a NUL byte"
    } else if format!("{}.json", name) == CATALOG_FILE {
        "name collides with the catalog file"
    } else {
        return Ok(());
    };

    Err(DbError::InvalidTableName {
        name: name.to_string(),
        reason,
    })
}
