//! String-valued key/value substrates the snapshot store persists into.

use crate::error::StorageError;
use rusqlite::{Connection, OptionalExtension};
#[cfg(test)]
use std::collections::HashMap;

pub trait Storage {
    /// Unreadable values are reported as absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Either stores `value` completely or leaves the previous value in place.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

fn check_quota(
    quota: Option<usize>,
    others: usize,
    value: &str,
) -> Result<(), StorageError> {
    let Some(limit) = quota else {
        return Ok(());
    };
    let needed = others + value.len();
    if needed > limit {
        return Err(StorageError::QuotaExceeded { needed, limit });
    }
    Ok(())
}

/// Keys and values in the workspace database's `kv_store` table.
pub struct SqliteStorage {
    conn: Connection,
    quota: Option<usize>,
}

impl SqliteStorage {
    pub fn new(conn: Connection, quota: Option<usize>) -> Self {
        Self { conn, quota }
    }

    fn bytes_excluding(&self, key: &str) -> Result<usize, StorageError> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(value AS BLOB))), 0) FROM kv_store WHERE key <> ?",
            [key],
            |r| r.get(0),
        )?;
        Ok(usize::try_from(total).unwrap_or(0))
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Option<String> {
        let res = self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |r| {
                r.get::<_, String>(0)
            })
            .optional();
        match res {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %e, "storage read failed");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.quota.is_some() {
            check_quota(self.quota, self.bytes_excluding(key)?, value)?;
        }
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv_store(key, value, updated_at) VALUES(?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, value, &now),
        )?;
        Ok(())
    }
}

/// In-process substrate with the same quota behavior as [`SqliteStorage`].
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(limit: usize) -> Self {
        Self {
            quota: Some(limit),
            ..Self::default()
        }
    }

    pub fn set_quota(&mut self, quota: Option<usize>) {
        self.quota = quota;
    }

    /// Writes a raw value, bypassing the quota.
    pub fn insert_raw(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let others: usize = self
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum();
        check_quota(self.quota, others, value)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
