//! Embedded, in-process record store.
//!
//! Provides named tables of auto-identified JSON records safe for concurrent
//! use from many threads, plus directory-based JSON snapshots.

pub mod config;
pub mod database;
pub mod error;
pub mod persistence;
pub mod table;

pub use config::DbConfig;
pub use database::Database;
pub use error::{DbError, TableSaveError};
pub use table::{Record, Table, TableHandle};
