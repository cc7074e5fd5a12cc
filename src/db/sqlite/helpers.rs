//! Shared helper functions for the SQLite adapter.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::db::Row;

const MUTATION_PREFIXES: [&str; 3] = ["INSERT", "UPDATE", "DELETE"];

/// Classify a statement as a mutation by its leading keyword.
///
/// This is a case-insensitive prefix test on the statement with leading
/// whitespace removed. It does not parse SQL: a statement starting with a
/// comment or a CTE (`WITH ... INSERT`) is treated as a read.
pub fn is_mutation(statement: &str) -> bool {
    let head = statement.trim_start();
    MUTATION_PREFIXES.iter().any(|prefix| {
        head.get(..prefix.len())
            .is_some_and(|h| h.eq_ignore_ascii_case(prefix))
    })
}

/// Convert a SQLite row into a JSON object keyed by column name.
///
/// Decoding follows the storage class of each value rather than the declared
/// column type, since SQLite columns are dynamically typed.
pub fn row_to_json(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut out = Map::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "INTEGER" | "BIGINT" | "INT8" | "BOOLEAN" => {
                    Value::from(row.try_get_unchecked::<i64, _>(index)?)
                }
                "REAL" | "NUMERIC" => Value::from(row.try_get_unchecked::<f64, _>(index)?),
                "BLOB" => {
                    let bytes: Vec<u8> = row.try_get_unchecked(index)?;
                    Value::String(STANDARD.encode(bytes))
                }
                _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
            }
        };
        out.insert(column.name().to_string(), value);
    }

    Ok(out)
}
