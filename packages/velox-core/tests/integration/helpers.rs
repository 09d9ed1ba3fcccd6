//! Shared fixtures for integration tests.

use std::collections::BTreeMap;

use serde_json::Value;
use velox_core::{Database, DbConfig};

/// Config with retries that never sleep.
pub fn fast_config() -> DbConfig {
    DbConfig {
        persistence_retry_delay_ms: 0,
        ..Default::default()
    }
}

/// Collects every table's records as `name -> (id -> data)`.
pub fn dump(db: &Database) -> BTreeMap<String, BTreeMap<u64, Value>> {
    db.table_names()
        .into_iter()
        .map(|name| {
            let records = db
                .get_table(&name)
                .unwrap()
                .records()
                .unwrap()
                .into_iter()
                .map(|r| (r.id(), r.into_data()))
                .collect();
            (name, records)
        })
        .collect()
}
