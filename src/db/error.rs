//! Database error types.
//!
//! Every adapter reports failures through the same three kinds so callers
//! can match on them without knowing which backend is behind a connection.
//! It uses miette for fancy diagnostic output and thiserror for derive macros.

use miette::Diagnostic;
use thiserror::Error;

/// Database operation errors.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    /// Acquiring a native handle failed, or the adapter has no live handle.
    #[error("Connection error: {message}")]
    #[diagnostic(code(unidb::db::connection_error))]
    Connection { message: String },

    /// A statement or document operation failed against a live handle.
    #[error("Query error: {message}")]
    #[diagnostic(code(unidb::db::query_error))]
    Query {
        message: String,
        /// The statement (or operation description) that failed.
        statement: Option<String>,
    },

    /// A configuration or schema shape check failed before any I/O.
    #[error("Validation error: {message}")]
    #[diagnostic(code(unidb::db::validation_error))]
    Validation { message: String },
}

impl DbError {
    pub(crate) fn connection(message: impl Into<String>) -> Self {
        DbError::Connection {
            message: message.into(),
        }
    }

    pub(crate) fn query(message: impl Into<String>, statement: Option<&str>) -> Self {
        DbError::Query {
            message: message.into(),
            statement: statement.map(str::to_string),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        DbError::Validation {
            message: message.into(),
        }
    }

    /// Statement text attached to a query error, if any.
    pub fn statement(&self) -> Option<&str> {
        match self {
            DbError::Query { statement, .. } => statement.as_deref(),
            _ => None,
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
