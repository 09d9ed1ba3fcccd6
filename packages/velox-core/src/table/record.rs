//! Identified record payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record owned by exactly one table.
///
/// The id is issued by the owning table and never changes; the payload is an
/// opaque JSON value replaced wholesale on update. Serializes as
/// `{ "id": <integer>, "data": <any> }`, the per-table snapshot element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: u64,
    data: Value,
}

impl Record {
    pub(crate) fn new(id: u64, data: Value) -> Self {
        Self { id, data }
    }

    /// Returns the record id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the record payload.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Consumes the record, returning its payload.
    pub fn into_data(self) -> Value {
        self.data
    }

    pub(crate) fn replace_data(&mut self, data: Value) {
        self.data = data;
    }
}
