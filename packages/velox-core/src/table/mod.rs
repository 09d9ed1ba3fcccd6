//! Tables, records, and per-table locking.

mod record;
#[allow(clippy::module_inception)]
mod table;

pub use record::Record;
pub use table::{Table, TableHandle};
