//! JSON snapshot layout, table file flush/load, and catalog handling.
//!
//! A snapshot directory contains:
//! - `master.json`: object keyed by table name. Values are markers of the form
//!   `{ "records": <count> }`; loading only looks at the keys.
//! - `<table>.json`: array of `{ "id": <integer>, "data": <any> }` objects.

pub mod io_utils;


use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::DbConfig;
use crate::database::{validate_table_name, TableRegistry};
use crate::error::{DbError, TableSaveError};
use crate::table::{Record, Table, TableHandle};

use self::io_utils::{classify_io_error, write_atomic, RetryPolicy, SnapshotFile};

/// Catalog file name inside a snapshot directory.
pub const CATALOG_FILE: &str = "master.json";

/// Catalog marker written for each table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Number of records written to the table file
    pub records: usize,
}

/// Returns the snapshot file name for a table.
pub fn table_file_name(table: &str) -> String {
    format!("{}.json", table)
}

/// Reads and writes snapshots in a single directory.
#[derive(Debug)]
pub struct SnapshotStore {
    /// Snapshot directory path
    dir: PathBuf,
    /// Retry policy for transient I/O errors
    retry: RetryPolicy,
    /// Pretty-print written JSON
    pretty: bool,
}

impl SnapshotStore {
    /// Creates a store for `dir` using the retry and formatting settings of `config`.
    pub fn new(dir: impl Into<PathBuf>, config: &DbConfig) -> Self {
        Self {
            dir: dir.into(),
            retry: RetryPolicy::from_config(config),
            pretty: config.pretty_snapshots,
        }
    }

    /// Returns the snapshot directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the catalog path.
    pub fn catalog_path(&self) -> PathBuf {
        self.dir.join(CATALOG_FILE)
    }

    /// Returns the data file path for a table.
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(table_file_name(table))
    }

    /// Reads the table names listed in the catalog.
    ///
    /// # Returns
    /// `Result<Vec<String>, DbError>` with names in ascending order.
    pub fn read_catalog(&self) -> Result<Vec<String>, DbError> {
        let path = self.catalog_path();
        let bytes = self.read_file(&path, SnapshotFile::Catalog)?;
        let catalog: BTreeMap<String, IgnoredAny> = serde_json::from_slice(&bytes)
            .map_err(|e| DbError::DecodeError(format!("{}: {}", path.display(), e)))?;

        let names: Vec<String> = catalog.into_keys().collect();
        for name in &names {
            validate_table_name(name)?;
        }
        Ok(names)
    }

    /// Loads one table from its data file.
    ///
    /// # Returns
    /// `Result<Table, DbError>` with the id counter set past the largest
    /// restored id.
    pub fn read_table(&self, name: &str) -> Result<Table, DbError> {
        let path = self.table_path(name);
        let bytes = self.read_file(&path, SnapshotFile::Table(name))?;
        let records: Vec<Record> = serde_json::from_slice(&bytes)
            .map_err(|e| DbError::DecodeError(format!("{}: {}", path.display(), e)))?;

        let count = records.len();
        let table = Table::from_records(name, records)?;
        tracing::debug!("Loaded {} records into table '{}'", count, name);
        Ok(table)
    }

    /// Loads every table listed in the catalog into a fresh registry.
    ///
    /// Fails on the first unreadable or malformed file; no table is skipped.
    pub(crate) fn load_tables(&self) -> Result<TableRegistry, DbError> {
        let names = self.read_catalog()?;
        tracing::debug!(
            "Catalog {} lists {} tables",
            self.catalog_path().display(),
            names.len()
        );

        #[cfg(feature = "parallel")]
        let tables = names
            .par_iter()
            .map(|name| self.read_table(name).map(|table| (name.clone(), table)))
            .collect::<Result<Vec<_>, DbError>>()?;

        #[cfg(not(feature = "parallel"))]
        let tables = names
            .iter()
            .map(|name| self.read_table(name).map(|table| (name.clone(), table)))
            .collect::<Result<Vec<_>, DbError>>()?;

        let registry = TableRegistry::with_capacity(tables.len());
        for (name, table) in tables {
            registry.insert(name, Arc::new(table));
        }
        Ok(registry)
    }

    /// Writes one table's records to its data file, replacing any previous file.
    ///
    /// # Returns
    /// `Result<usize, DbError>` containing the number of records written.
    pub fn write_table(&self, name: &str, table: &Table) -> Result<usize, DbError> {
        let records = table.records()?;
        let bytes = self.encode(&records)?;
        let path = self.table_path(name);

        let file = SnapshotFile::Table(name);
        self.retry
            .run(file, || write_atomic(&path, &bytes, file))?;

        tracing::debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(records.len())
    }

    /// Writes the catalog file.
    pub fn write_catalog(&self, entries: &BTreeMap<String, CatalogEntry>) -> Result<(), DbError> {
        let bytes = self.encode(entries)?;
        let path = self.catalog_path();
        self.retry.run(SnapshotFile::Catalog, || {
            write_atomic(&path, &bytes, SnapshotFile::Catalog)
        })
    }

    /// Writes every table, then the catalog.
    ///
    /// All tables are attempted even when some fail. The catalog is written
    /// only if every table file was, so a catalog never names a table whose
    /// file is stale or missing from this save.
    pub(crate) fn save_tables(
        &self,
        tables: &[(String, TableHandle)],
        write_catalog: bool,
    ) -> Result<(), DbError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| classify_io_error(e, SnapshotFile::Directory, &self.dir))?;

        #[cfg(feature = "parallel")]
        let outcomes: Vec<(String, Result<usize, DbError>)> = tables
            .par_iter()
            .map(|(name, table)| (name.clone(), self.write_table(name, table)))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<(String, Result<usize, DbError>)> = tables
            .iter()
            .map(|(name, table)| (name.clone(), self.write_table(name, table)))
            .collect();

        let mut catalog = BTreeMap::new();
        let mut failures = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(records) => {
                    catalog.insert(name, CatalogEntry { records });
                }
                Err(error) => {
                    tracing::error!("Failed to save table {}: {}", name, error);
                    failures.push(TableSaveError { table: name, error });
                }
            }
        }

        tracing::info!(
            "Save completed: {}/{} tables written to {}, {} errors",
            catalog.len(),
            tables.len(),
            self.dir.display(),
            failures.len()
        );

        if !failures.is_empty() {
            return Err(DbError::SaveFailed { failures });
        }

        if write_catalog {
            self.write_catalog(&catalog)?;
        }
        Ok(())
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, DbError> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded.map_err(|e| DbError::SerializationError(e.to_string()))
    }

    fn read_file(&self, path: &Path, file: SnapshotFile<'_>) -> Result<Vec<u8>, DbError> {
        self.retry.run(file, || {
            fs::read(path).map_err(|e| classify_io_error(e, file, path))
        })
    }
}
