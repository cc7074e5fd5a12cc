//! PostgreSQL adapter over a sqlx connection pool.
//!
//! Transactions check out one pooled connection and drive it with explicit
//! `BEGIN` / `COMMIT` / `ROLLBACK` statements before returning it to the pool.

use futures_util::TryStreamExt;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Either, Executor, Postgres};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::decode::row_to_json;
use crate::db::handle::HandleSlot;
use crate::db::sql::{begin_failed, bind_params, query_failed};
use crate::db::transaction::{TransactionControl, run_transaction};
use crate::db::{
    BackendKind, DatabaseAdapter, DbError, DbResult, PostgresConfig, QueryResult, Queryable,
};

const BACKEND: &str = "postgres";

/// Pooled PostgreSQL adapter.
pub struct PostgresAdapter {
    config: PostgresConfig,
    pool: HandleSlot<PgPool>,
}

impl PostgresAdapter {
    pub fn new(config: PostgresConfig) -> Self {
        Self {
            config,
            pool: HandleSlot::new("PostgreSQL"),
        }
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(&self.config.database)
            .username(&self.config.user)
            .password(&self.config.password)
    }

    /// Check out a connection and open a transaction on it.
    pub(crate) async fn begin(&self) -> DbResult<PostgresTransaction> {
        let pool = self.pool.get()?;
        let conn = pool.acquire().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "Failed to check out connection");
            begin_failed(e)
        })?;
        // Built before BEGIN so a cancelled BEGIN also discards the connection.
        let tx = PostgresTransaction {
            conn: Mutex::new(conn),
            released: false,
        };
        {
            let mut conn = tx.conn.lock().await;
            execute(&mut **conn, "BEGIN", &[]).await?;
        }
        Ok(tx)
    }
}

async fn collect<'e, E>(
    executor: E,
    statement: &'e str,
    params: &[Value],
) -> Result<QueryResult, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = bind_params(sqlx::query::<Postgres>(statement), params);
    let mut stream = executor.fetch_many(query);
    let mut rows = Vec::new();
    let mut rows_affected = 0;

    while let Some(step) = stream.try_next().await? {
        match step {
            Either::Left(done) => rows_affected += done.rows_affected(),
            Either::Right(row) => rows.push(row_to_json(&row)?),
        }
    }

    Ok(QueryResult {
        rows,
        last_insert_id: None,
        rows_affected: Some(rows_affected),
    })
}

async fn execute<'e, E>(executor: E, statement: &'e str, params: &[Value]) -> DbResult<QueryResult>
where
    E: Executor<'e, Database = Postgres>,
{
    debug!(backend = BACKEND, sql = statement, params = ?params, "Executing query");
    collect(executor, statement, params).await.map_err(|e| {
        error!(backend = BACKEND, sql = statement, params = ?params, error = %e, "Query failed");
        query_failed(e, statement)
    })
}

impl Queryable for PostgresAdapter {
    type Params = Vec<Value>;
    type Transaction = PostgresTransaction;

    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn query(&self, statement: &str, params: Vec<Value>) -> DbResult<QueryResult> {
        let pool = self.pool.get()?;
        execute(&pool, statement, &params).await
    }

    async fn transaction<T, F>(&self, body: F) -> DbResult<T>
    where
        F: AsyncFnOnce(&PostgresTransaction) -> DbResult<T>,
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

impl DatabaseAdapter for PostgresAdapter {
    async fn connect(&self) -> DbResult<()> {
        if self.pool.is_set() {
            warn!(backend = BACKEND, "Already connected to PostgreSQL");
            return Ok(());
        }

        let pool = PgPoolOptions::new()
            .max_connections(self.config.pool_size())
            .acquire_timeout(self.config.connect_timeout())
            .connect_with(self.connect_options())
            .await
            .map_err(|e| {
                error!(backend = BACKEND, host = %self.config.host, error = %e, "Failed to connect to PostgreSQL");
                DbError::connection(format!("PostgreSQL connection failed: {}", e))
            })?;

        if let Some(extra) = self.pool.install(pool)? {
            warn!(backend = BACKEND, "Already connected to PostgreSQL, closing the extra pool");
            extra.close().await;
            return Ok(());
        }
        info!(backend = BACKEND, host = %self.config.host, database = %self.config.database, "Connected to PostgreSQL");
        Ok(())
    }

    async fn disconnect(&self) -> DbResult<()> {
        if let Some(pool) = self.pool.take()? {
            pool.close().await;
            info!(backend = BACKEND, "Disconnected from PostgreSQL");
        }
        Ok(())
    }
}

/// A transaction on one checked-out PostgreSQL connection.
///
/// If the context is dropped without being released (the transaction future
/// was cancelled), the connection is closed instead of going back to the
/// pool with the transaction still open.
pub struct PostgresTransaction {
    conn: Mutex<PoolConnection<Postgres>>,
    released: bool,
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if !self.released {
            warn!(backend = BACKEND, "Transaction abandoned, discarding its connection");
            self.conn.get_mut().close_on_drop();
        }
    }
}

impl Queryable for PostgresTransaction {
    type Params = Vec<Value>;
    type Transaction = PostgresTransaction;

    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn query(&self, statement: &str, params: Vec<Value>) -> DbResult<QueryResult> {
        let mut conn = self.conn.lock().await;
        execute(&mut **conn, statement, &params).await
    }

    async fn transaction<T, F>(&self, body: F) -> DbResult<T>
    where
        F: AsyncFnOnce(&PostgresTransaction) -> DbResult<T>,
    {
        debug!(backend = BACKEND, "Reusing open transaction");
        body(self).await
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.conn.lock().await;
        sqlx::query("SELECT 1").fetch_one(&mut **conn).await.is_ok()
    }
}

impl TransactionControl for PostgresTransaction {
    async fn commit(&self) -> DbResult<()> {
        let mut conn = self.conn.lock().await;
        execute(&mut **conn, "COMMIT", &[]).await.map(|_| ())
    }

    async fn rollback(&self) -> DbResult<()> {
        let mut conn = self.conn.lock().await;
        execute(&mut **conn, "ROLLBACK", &[]).await.map(|_| ())
    }

    async fn release(mut self) {
        self.released = true;
        debug!(backend = BACKEND, "Released transaction connection");
    }
}
