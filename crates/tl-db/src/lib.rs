//! Read-only access to the SQLite state databases editors keep on disk.
//!
//! These databases belong to another application that may be running and
//! writing to them, so connections are always opened read-only and never
//! create, migrate, or lock anything beyond what a reader needs.
//!
//! # Thread Safety
//!
//! [`StateDb`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. Parallel scans open one connection per worker instead of sharing.
//!
//! # Key/value tables
//!
//! Both tables used by Cursor have the shape `(key TEXT, value BLOB)`. Values
//! are JSON documents stored either as TEXT or as UTF-8 BLOBs depending on
//! the writer's version; [`StateDb`] accepts both.

pub mod cursor;

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The database file does not exist.
    #[error("database not found: {0}")]
    Missing(PathBuf),
}

/// A key/value table inside a state database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvTable {
    /// Global storage: composer sessions and their message bubbles.
    CursorDiskKv,
    /// Per-workspace storage: VS Code style item table.
    ItemTable,
}

impl KvTable {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CursorDiskKv => "cursorDiskKV",
            Self::ItemTable => "ItemTable",
        }
    }
}

/// Read-only connection to a state database.
pub struct StateDb {
    conn: Connection,
}

impl std::fmt::Debug for StateDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDb")
            .field("path", &self.conn.path())
            .finish_non_exhaustive()
    }
}

impl StateDb {
    /// Opens an existing database without write access.
    ///
    /// Never creates the file: a missing database is reported as
    /// [`StoreError::Missing`].
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        if !path.is_file() {
            return Err(StoreError::Missing(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    pub fn has_table(&self, table: KvTable) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Value of a single key, if present and textual.
    pub fn get(&self, table: KvTable, key: &str) -> Result<Option<String>, StoreError> {
        if !self.has_table(table)? {
            return Ok(None);
        }
        let sql = format!("SELECT value FROM {} WHERE key = ?1", table.as_str());
        let value = self
            .conn
            .query_row(&sql, params![key], |row| text_column(row, 0))
            .optional()?;
        Ok(value.flatten())
    }

    /// Every `(key, value)` pair whose key starts with `prefix`.
    ///
    /// A missing table yields no rows. Rows whose value is not text are skipped.
    pub fn scan_prefix(
        &self,
        table: KvTable,
        prefix: &str,
    ) -> Result<Vec<(String, String)>, StoreError> {
        if !self.has_table(table)? {
            tracing::debug!(table = table.as_str(), "table not present");
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT key, value FROM {} WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key",
            table.as_str()
        );
        let pattern = format!("{}%", escape_like(prefix));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![pattern], |row| {
            let key: String = row.get(0)?;
            Ok(text_column(row, 1)?.map(|value| (key, value)))
        })?;

        let mut pairs = Vec::new();
        for row in rows {
            if let Some(pair) = row? {
                pairs.push(pair);
            }
        }
        Ok(pairs)
    }
}

/// Read a column stored as TEXT or as a UTF-8 BLOB.
fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => std::str::from_utf8(bytes)
            .ok()
            .map(str::to_string),
        ValueRef::Null | ValueRef::Integer(_) | ValueRef::Real(_) => None,
    })
}

/// Escape LIKE wildcards so a key prefix matches literally.
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
