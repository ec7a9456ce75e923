//! Row formatting for the response envelope.

use serde_json::{Map, Value};

/// Zip each row positionally with the column names into one JSON object per
/// row. Pure and total over equal-arity inputs; column-name uniqueness is
/// assumed, not checked.
pub fn format_rows(columns: &[String], rows: &[Vec<Value>]) -> Vec<Map<String, Value>> {
    rows.iter()
        .map(|row| {
            columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect::<Map<String, Value>>()
        })
        .collect()
}
