//! MySQL adapter over a sqlx connection pool.
//!
//! Transactions use the driver's own transaction object: `pool.begin()`
//! checks out a connection, `commit()` / `rollback()` end it and hand the
//! connection back to the pool.

use futures_util::TryStreamExt;
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{Either, Executor, MySql, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::decode::row_to_json;
use crate::db::handle::HandleSlot;
use crate::db::sql::{begin_failed, bind_params, query_failed};
use crate::db::transaction::{TransactionControl, run_transaction};
use crate::db::{
    BackendKind, DatabaseAdapter, DbError, DbResult, MySqlConfig, QueryResult, Queryable,
};

const BACKEND: &str = "mysql";

/// Pooled MySQL adapter.
pub struct MySqlAdapter {
    config: MySqlConfig,
    pool: HandleSlot<MySqlPool>,
}

impl MySqlAdapter {
    pub fn new(config: MySqlConfig) -> Self {
        Self {
            config,
            pool: HandleSlot::new("MySQL"),
        }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(&self.config.database)
            .username(&self.config.user)
            .password(&self.config.password)
    }

    /// Begin a driver-level transaction on a checked-out connection.
    pub(crate) async fn begin(&self) -> DbResult<MySqlTransaction> {
        let pool = self.pool.get()?;
        let tx = pool.begin().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "Failed to begin transaction");
            begin_failed(e)
        })?;
        Ok(MySqlTransaction {
            tx: Mutex::new(Some(tx)),
        })
    }
}

async fn collect<'e, E>(
    executor: E,
    statement: &'e str,
    params: &[Value],
) -> Result<QueryResult, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let query = bind_params(sqlx::query::<MySql>(statement), params);
    let mut stream = executor.fetch_many(query);
    let mut rows = Vec::new();
    let mut rows_affected = 0;
    let mut last_insert_id = None;

    while let Some(step) = stream.try_next().await? {
        match step {
            Either::Left(done) => {
                rows_affected += done.rows_affected();
                if done.last_insert_id() != 0 {
                    last_insert_id = Some(Value::from(done.last_insert_id()));
                }
            }
            Either::Right(row) => rows.push(row_to_json(&row)?),
        }
    }

    Ok(QueryResult {
        rows,
        last_insert_id,
        rows_affected: Some(rows_affected),
    })
}

async fn execute<'e, E>(executor: E, statement: &'e str, params: &[Value]) -> DbResult<QueryResult>
where
    E: Executor<'e, Database = MySql>,
{
    debug!(backend = BACKEND, sql = statement, params = ?params, "Executing query");
    collect(executor, statement, params).await.map_err(|e| {
        error!(backend = BACKEND, sql = statement, params = ?params, error = %e, "Query failed");
        query_failed(e, statement)
    })
}

impl Queryable for MySqlAdapter {
    type Params = Vec<Value>;
    type Transaction = MySqlTransaction;

    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    async fn query(&self, statement: &str, params: Vec<Value>) -> DbResult<QueryResult> {
        let pool = self.pool.get()?;
        execute(&pool, statement, &params).await
    }

    async fn transaction<T, F>(&self, body: F) -> DbResult<T>
    where
        F: AsyncFnOnce(&MySqlTransaction) -> DbResult<T>,
    {
        run_transaction(self.begin().await?, body).await
    }

    async fn health_check(&self) -> bool {
        match self.pool.get() {
            Ok(pool) => sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok(),
            Err(_) => false,
        }
    }
}

impl DatabaseAdapter for MySqlAdapter {
    async fn connect(&self) -> DbResult<()> {
        if self.pool.is_set() {
            warn!(backend = BACKEND, "Already connected to MySQL");
            return Ok(());
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(self.config.pool_size())
            .acquire_timeout(self.config.connect_timeout())
            .connect_with(self.connect_options())
            .await
            .map_err(|e| {
                error!(backend = BACKEND, host = %self.config.host, error = %e, "Failed to connect to MySQL");
                DbError::connection(format!("MySQL connection failed: {}", e))
            })?;

        if let Some(extra) = self.pool.install(pool)? {
            warn!(backend = BACKEND, "Already connected to MySQL, closing the extra pool");
            extra.close().await;
            return Ok(());
        }
        info!(backend = BACKEND, host = %self.config.host, database = %self.config.database, "Connected to MySQL");
        Ok(())
    }

    async fn disconnect(&self) -> DbResult<()> {
        if let Some(pool) = self.pool.take()? {
            pool.close().await;
            info!(backend = BACKEND, "Disconnected from MySQL");
        }
        Ok(())
    }
}

/// A driver-level MySQL transaction.
///
/// The sqlx transaction is consumed by commit or rollback; afterwards the
/// slot is empty and further queries fail. A context dropped while the
/// transaction is still open rolls back through sqlx's own drop handling.
pub struct MySqlTransaction {
    tx: Mutex<Option<Transaction<'static, MySql>>>,
}

fn finished() -> DbError {
    DbError::connection("MySQL transaction is already finished")
}

impl Queryable for MySqlTransaction {
    type Params = Vec<Value>;
    type Transaction = MySqlTransaction;

    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    async fn query(&self, statement: &str, params: Vec<Value>) -> DbResult<QueryResult> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        execute(&mut **tx, statement, &params).await
    }

    async fn transaction<T, F>(&self, body: F) -> DbResult<T>
    where
        F: AsyncFnOnce(&MySqlTransaction) -> DbResult<T>,
    {
        debug!(backend = BACKEND, "Reusing open transaction");
        body(self).await
    }

    async fn health_check(&self) -> bool {
        let mut guard = self.tx.lock().await;
        match guard.as_mut() {
            Some(tx) => sqlx::query("SELECT 1").fetch_one(&mut **tx).await.is_ok(),
            None => false,
        }
    }
}

impl TransactionControl for MySqlTransaction {
    async fn commit(&self) -> DbResult<()> {
        let tx = self.tx.lock().await.take().ok_or_else(finished)?;
        tx.commit().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "Commit failed");
            query_failed(e, "COMMIT")
        })
    }

    async fn rollback(&self) -> DbResult<()> {
        // A failed commit has already consumed the transaction; sqlx rolls
        // it back when it is dropped.
        let Some(tx) = self.tx.lock().await.take() else {
            return Ok(());
        };
        tx.rollback().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "Rollback failed");
            query_failed(e, "ROLLBACK")
        })
    }
}
