//! Shared handle to the configured database file

use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::SqliteMcpError;

/// Rows returned by a read-only query.
#[derive(Debug, serde::Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
}

/// A single read-only connection. Every caller goes through the mutex, so
/// concurrent requests are serialized.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl Database {
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, SqliteMcpError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SqliteMcpError::Connection(format!(
                "Database file not found: {}",
                path.display()
            )));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| SqliteMcpError::Connection(format!("{}: {e}", path.display())))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| SqliteMcpError::Connection(e.to_string()))?;

        // Opening is lazy in SQLite; touch the schema so unreadable files fail here.
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| SqliteMcpError::Connection(format!("{}: {e}", path.display())))?;

        tracing::info!(path = %path.display(), "Opened SQLite database (read-only)");

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of every table in the catalog, sorted.
    pub async fn table_names(&self) -> Result<Vec<String>, SqliteMcpError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .map_err(SqliteMcpError::catalog)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(SqliteMcpError::catalog)?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row.map_err(SqliteMcpError::catalog)?);
        }
        Ok(names)
    }

    /// The `CREATE TABLE` statement of `table`.
    pub async fn table_schema(&self, table: &str) -> Result<String, SqliteMcpError> {
        let conn = self.conn.lock().await;
        let sql: Option<Option<String>> = conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type='table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()
            .map_err(SqliteMcpError::catalog)?;

        match sql {
            Some(Some(sql)) => Ok(sql),
            _ => Err(SqliteMcpError::NotFound(format!(
                "Table '{table}' not found in database"
            ))),
        }
    }

    /// Every table's creation statement, keyed by table name. Tables without
    /// stored SQL are skipped.
    pub async fn all_schemas(&self) -> Result<BTreeMap<String, String>, SqliteMcpError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT name, sql FROM sqlite_master WHERE type='table'")
            .map_err(SqliteMcpError::catalog)?;
        let rows = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let sql: Option<String> = row.get(1)?;
                Ok((name, sql))
            })
            .map_err(SqliteMcpError::catalog)?;

        let mut schemas = BTreeMap::new();
        for row in rows {
            if let (name, Some(sql)) = row.map_err(SqliteMcpError::catalog)? {
                schemas.insert(name, sql);
            }
        }
        Ok(schemas)
    }

    /// Execute a statement that has already passed SELECT validation.
    pub async fn select(&self, sql: &str) -> Result<QueryResult, SqliteMcpError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(SqliteMcpError::PermissionDenied(
                "Statement would modify the database".into(),
            ));
        }

        let column_count = stmt.column_count();
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let rows = stmt.query_map([], |row| {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(sqlite_value_to_json(row.get_ref(i)?));
            }
            Ok(values)
        })?;

        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }

        Ok(QueryResult {
            columns,
            row_count: data.len(),
            rows: data,
        })
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        tracing::info!(path = %self.path.display(), "Database connection closed");
    }
}

pub fn sqlite_value_to_json(v: rusqlite::types::ValueRef<'_>) -> Value {
    use rusqlite::types::ValueRef;

    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(hex::encode(b)),
    }
}
