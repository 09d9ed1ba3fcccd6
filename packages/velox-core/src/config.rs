//! Database configuration.

use std::path::PathBuf;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Snapshot directory used by `save` until a `load` records another one
    pub data_dir: PathBuf,
    /// Maximum retry attempts for transient I/O errors
    pub persistence_max_retries: u32,
    /// Delay between retry attempts in milliseconds
    pub persistence_retry_delay_ms: u64,
    /// Rewrite the catalog file on every save.
    ///
    /// When false, `save` only writes table files and leaves any existing
    /// `master.json` untouched. Tables created since that catalog was written
    /// get a data file but are not listed, so a later `load` does not restore
    /// them. Only disable this when the catalog is maintained elsewhere.
    pub write_catalog: bool,
    /// Pretty-print snapshot JSON
    pub pretty_snapshots: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            persistence_max_retries: 3,      // Default retry attempts
            persistence_retry_delay_ms: 100, // 100ms delay between retries
            write_catalog: true,
            pretty_snapshots: false,
        }
    }
}
