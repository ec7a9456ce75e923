//! Query execution against the embedded SQLite store.
//!
//! Every call opens its own connection and drops it on every exit path;
//! nothing is pooled or shared between requests. The connection is opened
//! read-only, so a statement that slipped past the guard still cannot
//! mutate the store.

use crate::guard::AuthorizedQuery;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Store-level failure, split by whether the statement or the store itself
/// is at fault.
#[derive(Error, Debug)]
pub enum ExecutionFailure {
    /// The store rejected the statement: syntax error, unknown table or
    /// column. The caller's generated SQL is wrong, not the process.
    #[error("operational error: {0}")]
    Operational(String),

    /// The store could not be reached or a row could not be read.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExecutionFailure {
    pub fn detail(&self) -> &str {
        match self {
            ExecutionFailure::Operational(detail) => detail,
            ExecutionFailure::Internal(detail) => detail,
        }
    }
}

/// Full result set materialized in memory: ordered column names plus rows
/// in result order. No streaming or pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Run an authorized statement and fetch the entire result set.
pub fn execute_query(
    db_path: impl AsRef<Path>,
    query: &AuthorizedQuery,
) -> Result<QueryResult, ExecutionFailure> {
    let conn = Connection::open_with_flags(
        db_path.as_ref(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| ExecutionFailure::Internal(format!("Failed to open database: {}", e)))?;

    debug!(query = query.as_str(), "executing statement");

    // Unknown tables/columns and malformed SQL surface here.
    let mut stmt = conn
        .prepare(query.as_str())
        .map_err(|e| ExecutionFailure::Operational(e.to_string()))?;

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let column_count = columns.len();

    let mut rows = stmt
        .query([])
        .map_err(|e| ExecutionFailure::Operational(e.to_string()))?;

    let mut result_rows = Vec::new();
    loop {
        let row = match rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) => return Err(ExecutionFailure::Operational(e.to_string())),
        };

        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            let value = row
                .get_ref(idx)
                .map_err(|e| ExecutionFailure::Internal(e.to_string()))?;
            values.push(value_to_json(value));
        }
        result_rows.push(values);
    }

    Ok(QueryResult {
        columns,
        rows: result_rows,
    })
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::String(String::from_utf8_lossy(blob).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::authorize;
    use crate::schema::setup_database;
    use std::path::PathBuf;

    fn seeded_db(dir: &tempfile::TempDir) -> PathBuf {
        let db = dir.path().join("exec.db");
        setup_database(&db).unwrap();
        db
    }

    #[test]
    fn returns_rows_and_column_names_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = seeded_db(&dir);

        let query = authorize("SELECT * FROM Clientes ORDER BY cliente_id").unwrap();
        let result = execute_query(&db, &query).unwrap();

        assert_eq!(
            result.columns,
            vec!["cliente_id", "nome", "email", "data_cadastro"]
        );
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0][1], Value::from("Alice Silva"));
        assert_eq!(result.rows[1][0], Value::from(2));
    }

    #[test]
    fn repeated_execution_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let db = seeded_db(&dir);

        let query = authorize("SELECT nome, preco FROM Produtos ORDER BY produto_id").unwrap();
        let first = execute_query(&db, &query).unwrap();
        let second = execute_query(&db, &query).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn unknown_table_is_operational() {
        let dir = tempfile::tempdir().unwrap();
        let db = seeded_db(&dir);

        let query = authorize("SELECT * FROM Inexistente").unwrap();
        match execute_query(&db, &query) {
            Err(ExecutionFailure::Operational(detail)) => {
                assert!(detail.contains("Inexistente"), "detail: {}", detail);
            }
            other => panic!("expected operational failure, got {:?}", other),
        }
    }

    #[test]
    fn missing_database_file_is_internal() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("does_not_exist.db");

        let query = authorize("SELECT 1").unwrap();
        match execute_query(&db, &query) {
            Err(ExecutionFailure::Internal(_)) => {}
            other => panic!("expected internal failure, got {:?}", other),
        }
    }

    #[test]
    fn null_and_numeric_values_map_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let db = seeded_db(&dir);

        let query =
            authorize("SELECT NULL, estoque, preco, nome FROM Produtos WHERE produto_id = 101")
                .unwrap();
        let result = execute_query(&db, &query).unwrap();

        assert_eq!(result.rows[0][0], Value::Null);
        assert_eq!(result.rows[0][1], Value::from(5));
        assert_eq!(result.rows[0][2], Value::from(4500.0));
        assert_eq!(result.rows[0][3], Value::from("Notebook"));
    }
}
