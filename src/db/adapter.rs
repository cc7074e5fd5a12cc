//! The capability contract every backend implements.
//!
//! `Queryable` covers what is available both on a live adapter and inside a
//! transaction body. `DatabaseAdapter` adds the lifecycle operations, which
//! transaction contexts deliberately do not have.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::{BackendKind, DbResult, DocumentOperation};

/// One result row (or document), keyed by column/field name.
pub type Row = Map<String, Value>;

/// Normalised result of a statement or document operation.
///
/// Reads fill `rows`; mutations fill `rows_affected` and, where the backend
/// reports one, `last_insert_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_insert_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
}

impl QueryResult {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn mutation(last_insert_id: Option<Value>, rows_affected: u64) -> Self {
        Self {
            rows: vec![],
            last_insert_id,
            rows_affected: Some(rows_affected),
        }
    }

    /// First row, if any.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// `last_insert_id` as an integer, when the backend produced one.
    pub fn last_insert_id_i64(&self) -> Option<i64> {
        self.last_insert_id.as_ref().and_then(Value::as_i64)
    }
}

/// Arguments accepted by the backend-agnostic [`Adapter`](crate::db::Adapter).
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Positional SQL parameters, in backend-native placeholder order.
    Positional(Vec<Value>),
    /// A document-store operation.
    Document(DocumentOperation),
}

impl Params {
    pub fn none() -> Self {
        Params::Positional(vec![])
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl From<DocumentOperation> for Params {
    fn from(operation: DocumentOperation) -> Self {
        Params::Document(operation)
    }
}

/// Operations shared by adapters and open transactions.
#[allow(async_fn_in_trait)]
pub trait Queryable {
    /// Second argument to [`query`](Queryable::query).
    type Params;

    /// The handle given to a transaction body.
    type Transaction: Queryable<Params = Self::Params>;

    /// Which backend this handle talks to.
    fn kind(&self) -> BackendKind;

    /// Execute one statement (SQL) or operation (document store).
    ///
    /// For SQL backends `statement` is passed through verbatim; placeholder
    /// syntax is not translated. For the document backend `statement` names
    /// the collection.
    async fn query(&self, statement: &str, params: Self::Params) -> DbResult<QueryResult>;

    /// Run `body` inside one transaction.
    ///
    /// The body's success commits; its failure (or a failed commit) rolls
    /// back and the error is returned. Calling this on a transaction handle
    /// runs the body against that same handle, without a savepoint.
    async fn transaction<T, F>(&self, body: F) -> DbResult<T>
    where
        F: AsyncFnOnce(&Self::Transaction) -> DbResult<T>;

    /// Liveness check. Never fails; any error is reported as `false`.
    async fn health_check(&self) -> bool;
}

/// A backend adapter owning zero or one live native handle.
#[allow(async_fn_in_trait)]
pub trait DatabaseAdapter: Queryable {
    /// Acquire the native handle. A second call on a live adapter is a no-op.
    async fn connect(&self) -> DbResult<()>;

    /// Release the native handle. Safe to call repeatedly.
    async fn disconnect(&self) -> DbResult<()>;
}
