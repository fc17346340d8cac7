// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Destination Tables
//!
//! The write side of a sync pass: rows matched by a configured unique
//! key, created or updated in place. A sync pass never deletes a row and
//! never reads rows back for mapping.
//!
//! [`InMemoryTable`] backs tests and dry wiring; [`SqliteTable`] is the
//! relational destination. A [`TableProvider`] hands the driver one
//! table per collection configuration.

mod sqlite_table;

pub use sqlite_table::{SqliteBackend, SqliteTable};

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;

use crate::core::config::CollectionConfig;
use crate::core::error::{FireSyncError, FireSyncResult};
use crate::core::mapper::Record;

/// A destination table storing flat records.
pub trait Table: Debug + Send + Sync {
    /// Insert a new row.
    fn insert(&self, record: &Record) -> FireSyncResult<()>;

    /// Merge `record` into the row whose `key_field` equals `key`.
    /// Returns `true` if a row matched. Fields absent from `record` keep
    /// their existing values.
    fn update(&self, key_field: &str, key: &Value, record: &Record) -> FireSyncResult<bool>;

    /// Find the row whose `key_field` equals `key`.
    fn find(&self, key_field: &str, key: &Value) -> FireSyncResult<Option<Record>>;

    /// `true` if a row with `key_field` equal to `key` exists.
    fn contains(&self, key_field: &str, key: &Value) -> FireSyncResult<bool> {
        Ok(self.find(key_field, key)?.is_some())
    }

    /// Match-or-create: update the row matching `key`, or insert a new
    /// one. Returns `true` when an existing row was updated. Never
    /// creates a duplicate for the same key.
    fn upsert(&self, key_field: &str, key: &Value, record: &Record) -> FireSyncResult<bool> {
        if self.update(key_field, key, record)? {
            Ok(true)
        } else {
            self.insert(record)?;
            Ok(false)
        }
    }

    /// Number of rows currently stored.
    fn len(&self) -> FireSyncResult<usize>;

    fn is_empty(&self) -> FireSyncResult<bool> {
        Ok(self.len()? == 0)
    }

    /// All rows, for inspection in tests.
    fn all_rows(&self) -> FireSyncResult<Vec<Record>>;
}

/// Hands out one destination table per collection configuration.
pub trait TableProvider: Debug {
    fn table(&self, config: &CollectionConfig) -> FireSyncResult<Arc<dyn Table>>;
}

/// Serialize a key value for index lookups. Distinguishes types so the
/// string `"1"` and the integer `1` never collide.
fn key_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => format!("S:{s}"),
        Value::Number(n) => format!("N:{n}"),
        Value::Bool(b) => format!("B:{b}"),
        Value::Null => "X".to_string(),
        other => format!("J:{other}"),
    }
}

/// Simple in-memory table storing records in a vector with a key index
/// for O(1) upsert matching.
#[derive(Debug, Default)]
pub struct InMemoryTable {
    rows: RwLock<Vec<Record>>,
    // Index: "<field>=<serialized key>" → row position
    index: RwLock<HashMap<String, usize>>,
}

impl InMemoryTable {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            index: RwLock::new(HashMap::new()),
        }
    }

    fn index_key(key_field: &str, key: &Value) -> String {
        format!("{key_field}={}", key_to_string(key))
    }
}

impl Table for InMemoryTable {
    fn insert(&self, record: &Record) -> FireSyncResult<()> {
        let mut rows = self.rows.write().unwrap();
        let mut index = self.index.write().unwrap();
        let position = rows.len();
        for (field, value) in record {
            index.insert(Self::index_key(field, value), position);
        }
        rows.push(record.clone());
        Ok(())
    }

    fn update(&self, key_field: &str, key: &Value, record: &Record) -> FireSyncResult<bool> {
        let mut rows = self.rows.write().unwrap();
        let mut index = self.index.write().unwrap();
        let position = match index.get(&Self::index_key(key_field, key)) {
            Some(&p) => p,
            None => return Ok(false),
        };
        let row = rows
            .get_mut(position)
            .ok_or_else(|| FireSyncError::table("stale index entry"))?;
        for (field, value) in record {
            row.insert(field.clone(), value.clone());
            index.insert(Self::index_key(field, value), position);
        }
        Ok(true)
    }

    fn find(&self, key_field: &str, key: &Value) -> FireSyncResult<Option<Record>> {
        let rows = self.rows.read().unwrap();
        let index = self.index.read().unwrap();
        Ok(index
            .get(&Self::index_key(key_field, key))
            .and_then(|&p| rows.get(p).cloned()))
    }

    fn len(&self) -> FireSyncResult<usize> {
        Ok(self.rows.read().unwrap().len())
    }

    fn all_rows(&self) -> FireSyncResult<Vec<Record>> {
        Ok(self.rows.read().unwrap().clone())
    }
}

/// In-memory table provider; hands out one shared table per destination
/// table name so repeated passes hit the same rows.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: Mutex<HashMap<String, Arc<InMemoryTable>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableProvider for InMemoryBackend {
    fn table(&self, config: &CollectionConfig) -> FireSyncResult<Arc<dyn Table>> {
        let mut tables = self.tables.lock().unwrap();
        let table = tables
            .entry(config.table.clone())
            .or_insert_with(|| Arc::new(InMemoryTable::new()));
        Ok(Arc::clone(table) as Arc<dyn Table>)
    }
}
