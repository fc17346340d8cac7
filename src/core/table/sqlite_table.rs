// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed destination table.
//!
//! Each collection configuration maps to one table created from its
//! declared destination fields, with a UNIQUE constraint on the upsert
//! key column. Columns are declared without a type affinity so decoded
//! integers stay integers and strings stay strings. Composite values
//! that skipped the `serialize` transformation are stored as JSON text.

use std::sync::{Arc, Mutex};

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::{Number, Value};

use super::{Table, TableProvider};
use crate::core::config::CollectionConfig;
use crate::core::error::{FireSyncError, FireSyncResult};
use crate::core::mapper::Record;

/// Reject identifiers that cannot be safely quoted into SQL.
fn validate_identifier(name: &str) -> FireSyncResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(FireSyncError::configuration(format!(
            "invalid identifier '{name}': only ASCII alphanumerics and '_' are allowed"
        )))
    }
}

fn to_sql_value(value: &Value) -> FireSyncResult<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                return Err(FireSyncError::table(format!("unbindable number {n}")));
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        // Composite values that skipped the serialize transformation
        composite => SqlValue::Text(
            serde_json::to_string(composite)
                .map_err(|e| FireSyncError::table(e.to_string()))?,
        ),
    })
}

fn from_sql_value(value: SqlValue) -> Option<Value> {
    match value {
        SqlValue::Null => None,
        SqlValue::Integer(i) => Some(Value::Number(Number::from(i))),
        SqlValue::Real(f) => Number::from_f64(f).map(Value::Number),
        SqlValue::Text(s) => Some(Value::String(s)),
        SqlValue::Blob(_) => None,
    }
}

#[derive(Debug)]
pub struct SqliteTable {
    conn: Arc<Mutex<Connection>>,
    name: String,
    unique_key: String,
    columns: Vec<String>,
}

impl SqliteTable {
    /// Create (if needed) and open the destination table `name` with the
    /// given columns and a UNIQUE constraint on `unique_key`.
    pub fn create(
        conn: Arc<Mutex<Connection>>,
        name: impl Into<String>,
        unique_key: impl Into<String>,
        columns: Vec<String>,
    ) -> FireSyncResult<Self> {
        let name = name.into();
        let unique_key = unique_key.into();
        validate_identifier(&name)?;
        validate_identifier(&unique_key)?;
        for column in &columns {
            validate_identifier(column)?;
        }
        if !columns.iter().any(|c| c == &unique_key) {
            return Err(FireSyncError::configuration(format!(
                "unique key '{unique_key}' is not a declared column of '{name}'"
            )));
        }

        let column_list = columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS \"{name}\" ({column_list}, UNIQUE(\"{unique_key}\"))"
        );
        conn.lock()
            .unwrap()
            .execute(&ddl, [])
            .map_err(|e| FireSyncError::table_with_source(
                format!("cannot create table '{name}'"),
                Box::new(e),
            ))?;

        Ok(Self {
            conn,
            name,
            unique_key,
            columns,
        })
    }

    fn record_columns<'a>(&self, record: &'a Record) -> Vec<(&'a String, &'a Value)> {
        // Preserve record (mapping-table) order for deterministic SQL
        record.iter().collect()
    }
}

impl Table for SqliteTable {
    fn insert(&self, record: &Record) -> FireSyncResult<()> {
        let entries = self.record_columns(record);
        if entries.is_empty() {
            return Err(FireSyncError::table("cannot insert an empty record"));
        }
        let columns = entries
            .iter()
            .map(|(c, _)| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=entries.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO \"{}\" ({columns}) VALUES ({placeholders})",
            self.name
        );
        let params: Vec<SqlValue> = entries
            .iter()
            .map(|(_, v)| to_sql_value(v))
            .collect::<FireSyncResult<_>>()?;
        self.conn
            .lock()
            .unwrap()
            .execute(&sql, params_from_iter(params))
            .map_err(|e| {
                FireSyncError::table_with_source(
                    format!("insert into '{}' failed", self.name),
                    Box::new(e),
                )
            })?;
        Ok(())
    }

    fn update(&self, key_field: &str, key: &Value, record: &Record) -> FireSyncResult<bool> {
        validate_identifier(key_field)?;
        let entries = self.record_columns(record);
        if entries.is_empty() {
            return Ok(false);
        }
        let assignments = entries
            .iter()
            .enumerate()
            .map(|(i, (c, _))| format!("\"{c}\" = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE \"{}\" SET {assignments} WHERE \"{key_field}\" = ?{}",
            self.name,
            entries.len() + 1
        );
        let mut params: Vec<SqlValue> = entries
            .iter()
            .map(|(_, v)| to_sql_value(v))
            .collect::<FireSyncResult<_>>()?;
        params.push(to_sql_value(key)?);
        let changed = self
            .conn
            .lock()
            .unwrap()
            .execute(&sql, params_from_iter(params))
            .map_err(|e| {
                FireSyncError::table_with_source(
                    format!("update of '{}' failed", self.name),
                    Box::new(e),
                )
            })?;
        Ok(changed > 0)
    }

    fn find(&self, key_field: &str, key: &Value) -> FireSyncResult<Option<Record>> {
        validate_identifier(key_field)?;
        let columns = self
            .columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns} FROM \"{}\" WHERE \"{key_field}\" = ?1 LIMIT 1",
            self.name
        );
        let conn = self.conn.lock().unwrap();
        let mut statement = conn
            .prepare(&sql)
            .map_err(|e| FireSyncError::table_with_source("prepare failed", Box::new(e)))?;
        let mut rows = statement
            .query(params_from_iter([to_sql_value(key)?]))
            .map_err(|e| FireSyncError::table_with_source("query failed", Box::new(e)))?;
        let row = match rows
            .next()
            .map_err(|e| FireSyncError::table_with_source("row read failed", Box::new(e)))?
        {
            Some(row) => row,
            None => return Ok(None),
        };

        let mut record = Record::new();
        for (i, column) in self.columns.iter().enumerate() {
            let raw: SqlValue = row
                .get(i)
                .map_err(|e| FireSyncError::table_with_source("column read failed", Box::new(e)))?;
            if let Some(value) = from_sql_value(raw) {
                record.insert(column.clone(), value);
            }
        }
        Ok(Some(record))
    }

    fn len(&self) -> FireSyncResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", self.name);
        let count: i64 = self
            .conn
            .lock()
            .unwrap()
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| FireSyncError::table_with_source("count failed", Box::new(e)))?;
        Ok(count as usize)
    }

    fn all_rows(&self) -> FireSyncResult<Vec<Record>> {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {columns} FROM \"{}\"", self.name);
        let conn = self.conn.lock().unwrap();
        let mut statement = conn
            .prepare(&sql)
            .map_err(|e| FireSyncError::table_with_source("prepare failed", Box::new(e)))?;
        let mut rows = statement
            .query([])
            .map_err(|e| FireSyncError::table_with_source("query failed", Box::new(e)))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| FireSyncError::table_with_source("row read failed", Box::new(e)))?
        {
            let mut record = Record::new();
            for (i, column) in self.columns.iter().enumerate() {
                let raw: SqlValue = row.get(i).map_err(|e| {
                    FireSyncError::table_with_source("column read failed", Box::new(e))
                })?;
                if let Some(value) = from_sql_value(raw) {
                    record.insert(column.clone(), value);
                }
            }
            records.push(record);
        }
        Ok(records)
    }
}

/// SQLite table provider: one shared connection, one table per
/// collection configuration, created on first use.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &std::path::Path) -> FireSyncResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            FireSyncError::table_with_source(
                format!("cannot open database '{}'", path.display()),
                Box::new(e),
            )
        })?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> FireSyncResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            FireSyncError::table_with_source("cannot open in-memory database", Box::new(e))
        })?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl TableProvider for SqliteBackend {
    fn table(&self, config: &CollectionConfig) -> FireSyncResult<Arc<dyn Table>> {
        let table = SqliteTable::create(
            Arc::clone(&self.conn),
            config.table.clone(),
            config.unique_key.clone(),
            config.destination_fields(),
        )?;
        Ok(Arc::new(table) as Arc<dyn Table>)
    }
}
