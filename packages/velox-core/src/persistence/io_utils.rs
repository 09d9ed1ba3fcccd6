//! I/O utilities for persistence operations.

use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::config::DbConfig;
use crate::error::DbError;

/// Role of a path inside a snapshot directory, used to word I/O errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFile<'a> {
    /// The snapshot directory itself
    Directory,
    /// `master.json`
    Catalog,
    /// A table's data file
    Table(&'a str),
}

impl fmt::Display for SnapshotFile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotFile::Directory => write!(f, "snapshot directory"),
            SnapshotFile::Catalog => write!(f, "catalog"),
            SnapshotFile::Table(name) => write!(f, "data file of table '{}'", name),
        }
    }
}

/// Maps an I/O failure on a snapshot path to a DbError.
///
/// A missing catalog means the directory holds no snapshot; a missing table
/// file means the catalog names a table that was never written. Both stay
/// `IoError`, with messages that tell the two apart.
pub fn classify_io_error(error: std::io::Error, file: SnapshotFile<'_>, path: &Path) -> DbError {
    let message = match (error.kind(), file) {
        (ErrorKind::NotFound, SnapshotFile::Catalog) => {
            format!("no catalog at {}, not a snapshot directory", path.display())
        }
        (ErrorKind::NotFound, SnapshotFile::Table(name)) => format!(
            "table '{}' is listed in the catalog but {} is missing",
            name,
            path.display()
        ),
        _ => format!("{} {}: {}", file, path.display(), error),
    };

    match error.kind() {
        ErrorKind::StorageFull | ErrorKind::OutOfMemory => DbError::DiskFull(message),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
            DbError::TransientIoError(message)
        }
        _ => DbError::IoError(message),
    }
}

/// How often a snapshot file operation is repeated after a transient error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Pause before each extra attempt
    pub delay: Duration,
}

impl RetryPolicy {
    /// Builds the policy from `persistence_max_retries` and `persistence_retry_delay_ms`.
    pub fn from_config(config: &DbConfig) -> Self {
        Self {
            max_retries: config.persistence_max_retries,
            delay: Duration::from_millis(config.persistence_retry_delay_ms),
        }
    }

    /// Runs `operation`, repeating it only while it fails with `TransientIoError`.
    pub fn run<T, F>(&self, file: SnapshotFile<'_>, mut operation: F) -> Result<T, DbError>
    where
        F: FnMut() -> Result<T, DbError>,
    {
        let mut attempt = 0;
        loop {
            match operation() {
                Err(err @ DbError::TransientIoError(_)) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Retrying {} (attempt {}/{}): {}",
                        file,
                        attempt,
                        self.max_retries,
                        err
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
                result => return result,
            }
        }
    }
}

/// Replaces `path` with `bytes`.
///
/// Each call writes its own uniquely named temporary file next to `path`,
/// syncs it and renames it into place, so concurrent writers never share a
/// temporary and readers see one complete version of the file.
pub fn write_atomic(path: &Path, bytes: &[u8], file: SnapshotFile<'_>) -> Result<(), DbError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| classify_io_error(e, file, path))?;
    temp.write_all(bytes)
        .map_err(|e| classify_io_error(e, file, path))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| classify_io_error(e, file, path))?;

    // Dropping a failed PersistError removes the temporary file
    temp.persist(path)
        .map_err(|e| classify_io_error(e.error, file, path))?;
    Ok(())
}
