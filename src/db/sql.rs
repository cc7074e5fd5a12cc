//! Helpers shared by the sqlx-backed adapters.

use serde_json::Value;
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Database, Encode, Type};

use crate::db::DbError;

/// Bind positional JSON parameters onto a sqlx query.
///
/// Integers bind as `i64` (or `f64` when they do not fit), strings as text,
/// arrays and objects as JSON, and `null` as a null text value. PostgreSQL
/// rejects a text null for a non-text column unless the SQL casts it
/// (`$1::int`); write `NULL` literally where the column type matters.
pub(crate) fn bind_params<'q, DB>(
    mut query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    params: &[Value],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    Option<String>: Encode<'q, DB> + Type<DB>,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    Json<Value>: Encode<'q, DB> + Type<DB>,
{
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => query.bind(s.clone()),
            other => query.bind(Json(other.clone())),
        };
    }
    query
}

/// Wrap a native failure as a query error carrying the statement.
pub(crate) fn query_failed(error: sqlx::Error, statement: &str) -> DbError {
    DbError::query(error.to_string(), Some(statement))
}

/// Classify a failure to open a transaction.
///
/// Not getting a connection from the pool is a connection error; the server
/// rejecting `BEGIN` is a query error.
pub(crate) fn begin_failed(error: sqlx::Error) -> DbError {
    match error {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => {
            DbError::connection(format!("Failed to begin transaction: {}", error))
        }
        other => query_failed(other, "BEGIN"),
    }
}
