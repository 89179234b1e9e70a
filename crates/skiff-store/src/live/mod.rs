//! Live control-plane table storage.
//!
//! `LiveStore` is the per-table key-value contract the commit path writes
//! through: get one record by key, scan a whole table, and write a batch
//! of resolved records. `SqliteLiveStore` backs it with the migrated
//! `live_records` table.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, record_codec, Result};
use rusqlite::Connection;
use skiff_core::errors::SnapshotError;
use skiff_core::{Record, RecordKey, TableName};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Key-value contract over the live control-plane tables
pub trait LiveStore {
    /// Fetch one record by its primary key, if present
    fn get(&self, table: TableName, key: &RecordKey) -> Result<Option<Record>>;

    /// Write one record at its primary key, replacing any existing record
    fn put(&self, table: TableName, key: &RecordKey, record: &Record) -> Result<()>;

    /// Read every record in a table, in key order
    fn scan(&self, table: TableName) -> Result<Vec<Record>>;

    /// Write a batch of records for one table.
    ///
    /// The default walks `put` record by record; backends that can do
    /// better (a single transaction, a bulk write call) should override.
    fn put_batch(&self, table: TableName, entries: &[(RecordKey, Record)]) -> Result<()> {
        for (key, record) in entries {
            self.put(table, key, record)?;
        }
        Ok(())
    }
}

/// SQLite-backed live store over the `live_records` table
pub struct SqliteLiveStore {
    conn: Mutex<Connection>,
}

impl SqliteLiveStore {
    /// Open (or create) the backing database at the given path and run migrations
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(from_rusqlite)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing) and run migrations
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(from_rusqlite)?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        crate::migrations::apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SnapshotError::Persistence {
            op: "sqlite".to_string(),
            cause: "connection mutex poisoned".to_string(),
        })
    }

    /// Hand the inner connection to a caller that shares the database
    /// (the snapshot ledger lives in the same file).
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let conn = self.conn()?;
        f(&conn)
    }

    fn encode(record: &Record) -> Result<String> {
        serde_json::to_string(record).map_err(|e| record_codec("encode live record", e))
    }

    fn decode(json: &str) -> Result<Record> {
        serde_json::from_str(json).map_err(|e| record_codec("decode live record", e))
    }
}

impl LiveStore for SqliteLiveStore {
    fn get(&self, table: TableName, key: &RecordKey) -> Result<Option<Record>> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT record FROM live_records
                 WHERE table_name = ?1 AND hash_key = ?2 AND range_key = ?3",
                rusqlite::params![
                    table.as_str(),
                    key.hash.as_str(),
                    key.range.as_deref().unwrap_or("")
                ],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(from_rusqlite(other)),
            })?;

        json.as_deref().map(Self::decode).transpose()
    }

    fn put(&self, table: TableName, key: &RecordKey, record: &Record) -> Result<()> {
        let json = Self::encode(record)?;
        let now = chrono::Utc::now().timestamp_millis();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO live_records (table_name, hash_key, range_key, record, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(table_name, hash_key, range_key) DO UPDATE SET
                record = excluded.record,
                updated_at = excluded.updated_at",
            rusqlite::params![
                table.as_str(),
                key.hash.as_str(),
                key.range.as_deref().unwrap_or(""),
                json,
                now,
            ],
        )
        .map_err(from_rusqlite)?;

        Ok(())
    }

    fn scan(&self, table: TableName) -> Result<Vec<Record>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT record FROM live_records
                 WHERE table_name = ?1
                 ORDER BY hash_key, range_key",
            )
            .map_err(from_rusqlite)?;
        let rows: Vec<String> = stmt
            .query_map([table.as_str()], |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        rows.iter().map(|json| Self::decode(json)).collect()
    }

    fn put_batch(&self, table: TableName, entries: &[(RecordKey, Record)]) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(from_rusqlite)?;

        for (key, record) in entries {
            let json = Self::encode(record)?;
            tx.execute(
                "INSERT INTO live_records (table_name, hash_key, range_key, record, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(table_name, hash_key, range_key) DO UPDATE SET
                    record = excluded.record,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    table.as_str(),
                    key.hash.as_str(),
                    key.range.as_deref().unwrap_or(""),
                    json,
                    now,
                ],
            )
            .map_err(from_rusqlite)?;
        }

        tx.commit().map_err(from_rusqlite)?;
        tracing::debug!(
            table = table.as_str(),
            records = entries.len(),
            "Committed record batch"
        );
        Ok(())
    }
}
