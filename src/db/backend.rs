//! The closed set of adapters behind one type.
//!
//! [`Adapter`] and [`TransactionContext`] dispatch to the concrete backend
//! chosen at construction. Parameters travel as [`Params`]; a parameter kind
//! the backend cannot take is a query error.

use tracing::debug;

use crate::db::transaction::{TransactionControl, run_transaction};
use crate::db::{
    BackendConfig, BackendKind, DatabaseAdapter, DbError, DbResult, MongoAdapter,
    MongoTransaction, MySqlAdapter, MySqlTransaction, Params, PostgresAdapter,
    PostgresTransaction, QueryResult, Queryable, SqliteAdapter, SqliteTransaction,
};

fn unsupported_params(kind: BackendKind, statement: &str, params: &Params) -> DbError {
    let message = match params {
        Params::Document(op) => format!(
            "document operation {} is not supported by {}",
            op.name(),
            kind
        ),
        Params::Positional(_) => {
            "MongoDB operation failed: Unsupported operation".to_string()
        }
    };
    DbError::query(message, Some(statement))
}

/// One adapter, selected by backend tag.
pub enum Adapter {
    Postgres(PostgresAdapter),
    MySql(MySqlAdapter),
    Sqlite(SqliteAdapter),
    MongoDb(MongoAdapter),
}

impl Adapter {
    /// Build the adapter for a config. No I/O happens until `connect`.
    pub fn from_config(config: BackendConfig) -> Self {
        match config {
            BackendConfig::Postgres(c) => Adapter::Postgres(PostgresAdapter::new(c)),
            BackendConfig::MySql(c) => Adapter::MySql(MySqlAdapter::new(c)),
            BackendConfig::Sqlite(c) => Adapter::Sqlite(SqliteAdapter::new(c)),
            BackendConfig::MongoDb(c) => Adapter::MongoDb(MongoAdapter::new(c)),
        }
    }

    pub fn as_postgres(&self) -> Option<&PostgresAdapter> {
        match self {
            Adapter::Postgres(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_mysql(&self) -> Option<&MySqlAdapter> {
        match self {
            Adapter::MySql(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_sqlite(&self) -> Option<&SqliteAdapter> {
        match self {
            Adapter::Sqlite(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_mongodb(&self) -> Option<&MongoAdapter> {
        match self {
            Adapter::MongoDb(a) => Some(a),
            _ => None,
        }
    }
}

impl Queryable for Adapter {
    type Params = Params;
    type Transaction = TransactionContext;

    fn kind(&self) -> BackendKind {
        match self {
            Adapter::Postgres(_) => BackendKind::Postgres,
            Adapter::MySql(_) => BackendKind::MySql,
            Adapter::Sqlite(_) => BackendKind::Sqlite,
            Adapter::MongoDb(_) => BackendKind::MongoDb,
        }
    }

    async fn query(&self, statement: &str, params: Params) -> DbResult<QueryResult> {
        match (self, params) {
            (Adapter::Postgres(a), Params::Positional(p)) => a.query(statement, p).await,
            (Adapter::MySql(a), Params::Positional(p)) => a.query(statement, p).await,
            (Adapter::Sqlite(a), Params::Positional(p)) => a.query(statement, p).await,
            (Adapter::MongoDb(a), Params::Document(op)) => a.query(statement, op).await,
            (adapter, params) => Err(unsupported_params(adapter.kind(), statement, &params)),
        }
    }

    async fn transaction<T, F>(&self, body: F) -> DbResult<T>
    where
        F: AsyncFnOnce(&TransactionContext) -> DbResult<T>,
    {
        let ctx = match self {
            Adapter::Postgres(a) => TransactionContext::Postgres(a.begin().await?),
            Adapter::MySql(a) => TransactionContext::MySql(a.begin().await?),
            Adapter::Sqlite(a) => TransactionContext::Sqlite(a.begin().await?),
            Adapter::MongoDb(a) => TransactionContext::MongoDb(a.begin().await?),
        };
        run_transaction(ctx, body).await
    }

    async fn health_check(&self) -> bool {
        match self {
            Adapter::Postgres(a) => a.health_check().await,
            Adapter::MySql(a) => a.health_check().await,
            Adapter::Sqlite(a) => a.health_check().await,
            Adapter::MongoDb(a) => a.health_check().await,
        }
    }
}

impl DatabaseAdapter for Adapter {
    async fn connect(&self) -> DbResult<()> {
        match self {
            Adapter::Postgres(a) => a.connect().await,
            Adapter::MySql(a) => a.connect().await,
            Adapter::Sqlite(a) => a.connect().await,
            Adapter::MongoDb(a) => a.connect().await,
        }
    }

    async fn disconnect(&self) -> DbResult<()> {
        match self {
            Adapter::Postgres(a) => a.disconnect().await,
            Adapter::MySql(a) => a.disconnect().await,
            Adapter::Sqlite(a) => a.disconnect().await,
            Adapter::MongoDb(a) => a.disconnect().await,
        }
    }
}

/// An open transaction on whichever backend the [`Adapter`] wraps.
///
/// Has no `connect` / `disconnect`: it lives only for one transaction body.
pub enum TransactionContext {
    Postgres(PostgresTransaction),
    MySql(MySqlTransaction),
    Sqlite(SqliteTransaction),
    MongoDb(MongoTransaction),
}

impl Queryable for TransactionContext {
    type Params = Params;
    type Transaction = TransactionContext;

    fn kind(&self) -> BackendKind {
        match self {
            TransactionContext::Postgres(_) => BackendKind::Postgres,
            TransactionContext::MySql(_) => BackendKind::MySql,
            TransactionContext::Sqlite(_) => BackendKind::Sqlite,
            TransactionContext::MongoDb(_) => BackendKind::MongoDb,
        }
    }

    async fn query(&self, statement: &str, params: Params) -> DbResult<QueryResult> {
        match (self, params) {
            (TransactionContext::Postgres(t), Params::Positional(p)) => {
                t.query(statement, p).await
            }
            (TransactionContext::MySql(t), Params::Positional(p)) => t.query(statement, p).await,
            (TransactionContext::Sqlite(t), Params::Positional(p)) => t.query(statement, p).await,
            (TransactionContext::MongoDb(t), Params::Document(op)) => {
                t.query(statement, op).await
            }
            (ctx, params) => Err(unsupported_params(ctx.kind(), statement, &params)),
        }
    }

    async fn transaction<T, F>(&self, body: F) -> DbResult<T>
    where
        F: AsyncFnOnce(&TransactionContext) -> DbResult<T>,
    {
        debug!(backend = self.kind().as_str(), "Reusing open transaction");
        body(self).await
    }

    async fn health_check(&self) -> bool {
        match self {
            TransactionContext::Postgres(t) => t.health_check().await,
            TransactionContext::MySql(t) => t.health_check().await,
            TransactionContext::Sqlite(t) => t.health_check().await,
            TransactionContext::MongoDb(t) => t.health_check().await,
        }
    }
}

impl TransactionControl for TransactionContext {
    async fn commit(&self) -> DbResult<()> {
        match self {
            TransactionContext::Postgres(t) => t.commit().await,
            TransactionContext::MySql(t) => t.commit().await,
            TransactionContext::Sqlite(t) => t.commit().await,
            TransactionContext::MongoDb(t) => t.commit().await,
        }
    }

    async fn rollback(&self) -> DbResult<()> {
        match self {
            TransactionContext::Postgres(t) => t.rollback().await,
            TransactionContext::MySql(t) => t.rollback().await,
            TransactionContext::Sqlite(t) => t.rollback().await,
            TransactionContext::MongoDb(t) => t.rollback().await,
        }
    }

    async fn release(self) {
        match self {
            TransactionContext::Postgres(t) => t.release().await,
            TransactionContext::MySql(t) => t.release().await,
            TransactionContext::Sqlite(t) => t.release().await,
            TransactionContext::MongoDb(t) => t.release().await,
        }
    }
}
