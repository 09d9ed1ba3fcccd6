//! Concurrent record storage for a single table.
//!
//! Each table has:
//! - A map from record id to record
//! - A monotonically increasing id counter
//! - One reader-writer lock guarding both

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::error::DbError;

use super::record::Record;

/// Shared handle to a table registered in a database.
///
/// Every holder observes the same records and contends on the same lock.
pub type TableHandle = Arc<Table>;

/// A named collection of records with its own id allocation and lock.
#[derive(Debug)]
pub struct Table {
    /// Table name
    name: String,
    /// Records and id counter, mutated only under the write lock
    state: RwLock<TableState>,
}

#[derive(Debug)]
struct TableState {
    records: HashMap<u64, Record>,
    /// Strictly greater than every id ever issued, including deleted ones
    next_id: u64,
}

impl Table {
    /// Creates an empty table. The first issued id is 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(TableState {
                records: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Rebuilds a table from persisted records.
    ///
    /// The id counter restarts at `1 + max(id)`, or 1 when `records` is empty.
    ///
    /// # Returns
    /// `Result<Table, DbError>` failing with `InvalidPayload` on duplicate ids.
    pub fn from_records(name: impl Into<String>, records: Vec<Record>) -> Result<Self, DbError> {
        let name = name.into();
        let mut map = HashMap::with_capacity(records.len());
        let mut max_id = 0u64;

        for record in records {
            let id = record.id();
            if map.insert(id, record).is_some() {
                return Err(DbError::InvalidPayload {
                    table: name,
                    id,
                    reason: "duplicate record id".to_string(),
                });
            }
            max_id = max_id.max(id);
        }

        let next_id = max_id
            .checked_add(1)
            .ok_or_else(|| DbError::IdSpaceExhausted {
                table: name.clone(),
            })?;

        Ok(Self {
            name,
            state: RwLock::new(TableState {
                records: map,
                next_id,
            }),
        })
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores a new record and returns its id.
    ///
    /// Id allocation and insertion happen under one write lock, so concurrent
    /// creators always receive distinct, increasing ids.
    pub fn create(&self, data: Value) -> Result<u64, DbError> {
        let mut state = self.write_state()?;
        let id = state.next_id;
        state.next_id = id
            .checked_add(1)
            .ok_or_else(|| DbError::IdSpaceExhausted {
                table: self.name.clone(),
            })?;
        state.records.insert(id, Record::new(id, data));
        Ok(id)
    }

    /// Returns a copy of the payload stored under `id`.
    pub fn read(&self, id: u64) -> Result<Value, DbError> {
        let state = self.read_state()?;
        let record = self.lookup(&state.records, id)?;
        Ok(record.data().clone())
    }

    /// Returns a copy of the full record stored under `id`.
    pub fn read_record(&self, id: u64) -> Result<Record, DbError> {
        let state = self.read_state()?;
        let record = self.lookup(&state.records, id)?.clone();
        Ok(record)
    }

    /// Replaces the payload of an existing record, keeping its id.
    pub fn update(&self, id: u64, data: Value) -> Result<(), DbError> {
        let mut state = self.write_state()?;
        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| self.not_found(id))?;
        if record.id() != id {
            return Err(self.key_mismatch(id, record.id()));
        }
        record.replace_data(data);
        Ok(())
    }

    /// Removes a record. Its id is never issued again.
    pub fn delete(&self, id: u64) -> Result<(), DbError> {
        let mut state = self.write_state()?;
        state
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| self.not_found(id))
    }

    /// Returns true if a record with `id` exists.
    pub fn contains(&self, id: u64) -> Result<bool, DbError> {
        Ok(self.read_state()?.records.contains_key(&id))
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> Result<usize, DbError> {
        Ok(self.read_state()?.records.len())
    }

    /// Returns true if the table holds no records.
    pub fn is_empty(&self) -> Result<bool, DbError> {
        Ok(self.read_state()?.records.is_empty())
    }

    /// Returns the id the next `create` will issue, without allocating it.
    pub fn current_next_id(&self) -> Result<u64, DbError> {
        Ok(self.read_state()?.next_id)
    }

    /// Returns the ids of all stored records in ascending order.
    pub fn ids(&self) -> Result<Vec<u64>, DbError> {
        let state = self.read_state()?;
        let mut ids: Vec<u64> = state.records.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Returns a point-in-time copy of all records, ordered by id.
    ///
    /// Taken under a single read lock, so the copy reflects one consistent
    /// state of the table.
    pub fn records(&self) -> Result<Vec<Record>, DbError> {
        let state = self.read_state()?;
        let mut records: Vec<Record> = state.records.values().cloned().collect();
        records.sort_unstable_by_key(Record::id);
        Ok(records)
    }

    fn lookup<'a>(&self, records: &'a HashMap<u64, Record>, id: u64) -> Result<&'a Record, DbError> {
        let record = records.get(&id).ok_or_else(|| self.not_found(id))?;
        if record.id() != id {
            return Err(self.key_mismatch(id, record.id()));
        }
        Ok(record)
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, TableState>, DbError> {
        self.state.read().map_err(|_| DbError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, TableState>, DbError> {
        self.state.write().map_err(|_| DbError::LockPoisoned)
    }

    fn not_found(&self, id: u64) -> DbError {
        DbError::RecordNotFound {
            table: self.name.clone(),
            id,
        }
    }

    fn key_mismatch(&self, key: u64, stored: u64) -> DbError {
        DbError::InvalidPayload {
            table: self.name.clone(),
            id: key,
            reason: format!("stored under key {} but carries id {}", key, stored),
        }
    }
}
