//! MySQL row decoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::db::Row;

/// Convert a MySQL row into a JSON object keyed by column name.
pub fn row_to_json(row: &MySqlRow) -> Result<Row, sqlx::Error> {
    let mut out = Map::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        let value = if row.try_get_raw(index)?.is_null() {
            Value::Null
        } else {
            decode_column(row, index, column.type_info().name())?
        };
        out.insert(column.name().to_string(), value);
    }

    Ok(out)
}

fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match type_name {
        "BOOLEAN" => Value::from(row.try_get_unchecked::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::from(row.try_get_unchecked::<i64, _>(index)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" | "YEAR" => Value::from(row.try_get_unchecked::<u64, _>(index)?),
        "FLOAT" => Value::from(row.try_get_unchecked::<f32, _>(index)?),
        "DOUBLE" => Value::from(row.try_get_unchecked::<f64, _>(index)?),
        "DECIMAL" | "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT"
        | "ENUM" | "SET" => Value::String(row.try_get_unchecked::<String, _>(index)?),
        "JSON" => row.try_get_unchecked::<Value, _>(index)?,
        "DATETIME" => Value::String(
            row.try_get_unchecked::<NaiveDateTime, _>(index)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "TIMESTAMP" => Value::String(
            row.try_get_unchecked::<DateTime<Utc>, _>(index)?
                .to_rfc3339(),
        ),
        "DATE" => Value::String(row.try_get_unchecked::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::String(row.try_get_unchecked::<NaiveTime, _>(index)?.to_string()),
        // Binary strings come back as text when they are valid UTF-8.
        _ => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            match String::from_utf8(bytes) {
                Ok(text) => Value::String(text),
                Err(e) => Value::String(STANDARD.encode(e.into_bytes())),
            }
        }
    };
    Ok(value)
}
