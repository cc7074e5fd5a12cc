//! PostgreSQL row decoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::db::Row;

/// Convert a PostgreSQL row into a JSON object keyed by column name.
pub fn row_to_json(row: &PgRow) -> Result<Row, sqlx::Error> {
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

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match type_name {
        "BOOL" => Value::from(row.try_get_unchecked::<bool, _>(index)?),
        "INT2" => Value::from(row.try_get_unchecked::<i16, _>(index)?),
        "INT4" => Value::from(row.try_get_unchecked::<i32, _>(index)?),
        "INT8" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
        "FLOAT4" => Value::from(row.try_get_unchecked::<f32, _>(index)?),
        "FLOAT8" => Value::from(row.try_get_unchecked::<f64, _>(index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "UNKNOWN" => {
            Value::String(row.try_get_unchecked::<String, _>(index)?)
        }
        "JSON" | "JSONB" => row.try_get_unchecked::<Value, _>(index)?,
        "BYTEA" => Value::String(STANDARD.encode(row.try_get_unchecked::<Vec<u8>, _>(index)?)),
        "TIMESTAMPTZ" => Value::String(
            row.try_get_unchecked::<DateTime<Utc>, _>(index)?
                .to_rfc3339(),
        ),
        "TIMESTAMP" => Value::String(
            row.try_get_unchecked::<NaiveDateTime, _>(index)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "DATE" => Value::String(row.try_get_unchecked::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::String(row.try_get_unchecked::<NaiveTime, _>(index)?.to_string()),
        other => {
            return Err(sqlx::Error::ColumnDecode {
                index: index.to_string(),
                source: format!("unsupported column type {} (cast it to text)", other).into(),
            });
        }
    };
    Ok(value)
}
