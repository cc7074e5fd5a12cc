//! Pre-flight configuration checks.
//!
//! These are presence checks only: no coercion, no range checks, no
//! credential format checks. They run once, synchronously, before any
//! adapter is built.

use serde_json::Value;

use crate::db::{BackendConfig, BackendKind, DbError, DbResult};

/// Required settings per backend tag.
fn required_fields(kind: BackendKind) -> &'static [&'static str] {
    match kind {
        BackendKind::Postgres | BackendKind::MySql => {
            &["host", "port", "database", "user", "password"]
        }
        BackendKind::Sqlite => &["filename"],
        BackendKind::MongoDb => &["url", "database"],
    }
}

fn missing_fields_error(kind: BackendKind) -> DbError {
    match kind {
        BackendKind::Postgres | BackendKind::MySql => DbError::validation(format!(
            "Invalid config for {}: missing required fields",
            kind
        )),
        BackendKind::Sqlite => {
            DbError::validation("Invalid config for sqlite: missing filename")
        }
        BackendKind::MongoDb => {
            DbError::validation("Invalid config for mongodb: missing url or database")
        }
    }
}

/// JSON truthiness: null, false, 0, NaN and "" are all "absent".
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Validate an untyped settings object against a backend tag.
///
/// An unknown tag, a missing settings object, or a missing/falsy required
/// field all fail with [`DbError::Validation`].
pub fn validate_connection_config(tag: &str, config: &Value) -> DbResult<BackendKind> {
    if config.is_null() {
        return Err(DbError::validation("Configuration is required"));
    }

    let kind: BackendKind = tag.parse()?;
    let settings = config.as_object();
    let complete = required_fields(kind)
        .iter()
        .all(|field| is_truthy(settings.and_then(|s| s.get(*field))));

    if !complete {
        return Err(missing_fields_error(kind));
    }

    Ok(kind)
}

/// Validate a typed config with the same presence rules as the untyped form.
pub fn validate_backend_config(config: &BackendConfig) -> DbResult<()> {
    let complete = match config {
        BackendConfig::Postgres(c) => [&c.host, &c.database, &c.user, &c.password]
            .iter()
            .all(|s| !s.is_empty())
            && c.port != 0,
        BackendConfig::MySql(c) => [&c.host, &c.database, &c.user, &c.password]
            .iter()
            .all(|s| !s.is_empty())
            && c.port != 0,
        BackendConfig::Sqlite(c) => !c.filename.is_empty(),
        BackendConfig::MongoDb(c) => !c.url.is_empty() && !c.database.is_empty(),
    };

    if complete {
        Ok(())
    } else {
        Err(missing_fields_error(config.kind()))
    }
}
