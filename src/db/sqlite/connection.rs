//! SQLite adapter over a single file-backed connection.
//!
//! The adapter owns one `SqliteConnection`. Every caller, including open
//! transactions, goes through the same handle; the mutex serialises
//! individual statements only. Statements from other callers can land inside
//! an open transaction on this handle.
//!
//! A transaction context dropped before it was released (its future was
//! cancelled) marks the handle; the next caller to lock it rolls back first.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection, Sqlite};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use super::helpers::{is_mutation, row_to_json};
use crate::db::sql::{bind_params, query_failed};
use crate::db::transaction::{TransactionControl, run_transaction};
use crate::db::{
    BackendKind, DatabaseAdapter, DbError, DbResult, QueryResult, Queryable, SqliteConfig,
};

const BACKEND: &str = "sqlite";

/// The one connection, shared by the adapter and its transactions.
#[derive(Clone, Default)]
struct SharedHandle {
    conn: Arc<Mutex<Option<SqliteConnection>>>,
    abandoned: Arc<AtomicBool>,
}

impl SharedHandle {
    /// Lock the connection, first rolling back a transaction whose owner
    /// went away without finishing it.
    async fn lock(&self) -> MutexGuard<'_, Option<SqliteConnection>> {
        let mut guard = self.conn.lock().await;
        if !self.abandoned.swap(false, Ordering::AcqRel) {
            return guard;
        }
        if let Some(conn) = guard.as_mut() {
            match sqlx::query("ROLLBACK").execute(&mut *conn).await {
                Ok(_) => warn!(backend = BACKEND, "Rolled back abandoned transaction"),
                Err(e) => {
                    warn!(backend = BACKEND, error = %e, "Rollback of abandoned transaction failed")
                }
            }
        }
        guard
    }

    /// Lock without recovery, for replacing or closing the connection.
    async fn lock_raw(&self) -> MutexGuard<'_, Option<SqliteConnection>> {
        let guard = self.conn.lock().await;
        self.abandoned.store(false, Ordering::Release);
        guard
    }
}

/// Embedded SQLite adapter.
pub struct SqliteAdapter {
    config: SqliteConfig,
    conn: SharedHandle,
}

impl SqliteAdapter {
    pub fn new(config: SqliteConfig) -> Self {
        Self {
            config,
            conn: SharedHandle::default(),
        }
    }

    /// Open the transaction on the shared handle.
    pub(crate) async fn begin(&self) -> DbResult<SqliteTransaction> {
        // Built before BEGIN so a cancelled BEGIN is also cleaned up.
        let mut tx = SqliteTransaction {
            conn: self.conn.clone(),
            released: false,
        };
        if let Err(e) = run_control(&tx.conn, "BEGIN TRANSACTION").await {
            tx.released = true;
            return Err(e);
        }
        Ok(tx)
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, sqlx::Error> {
        if self.config.is_in_memory() {
            SqliteConnectOptions::from_str(":memory:")
        } else {
            Ok(SqliteConnectOptions::new()
                .filename(&self.config.filename)
                .create_if_missing(true))
        }
    }
}

fn not_connected() -> DbError {
    DbError::connection("SQLite adapter is not connected")
}

/// Execute a statement against a connection.
///
/// Mutations (by leading keyword) report the last inserted rowid and the
/// affected row count; everything else returns its rows.
async fn execute(
    conn: &mut SqliteConnection,
    statement: &str,
    params: &[Value],
) -> DbResult<QueryResult> {
    debug!(backend = BACKEND, sql = statement, params = ?params, "Executing query");

    let query = bind_params(sqlx::query::<Sqlite>(statement), params);
    let result = if is_mutation(statement) {
        query.execute(&mut *conn).await.map(|done| {
            QueryResult::mutation(
                Some(Value::from(done.last_insert_rowid())),
                done.rows_affected(),
            )
        })
    } else {
        match query.fetch_all(&mut *conn).await {
            Ok(rows) => rows
                .iter()
                .map(row_to_json)
                .collect::<Result<Vec<_>, _>>()
                .map(QueryResult::from_rows),
            Err(e) => Err(e),
        }
    };

    result.map_err(|e| {
        error!(backend = BACKEND, sql = statement, params = ?params, error = %e, "Query failed");
        query_failed(e, statement)
    })
}

async fn execute_shared(
    handle: &SharedHandle,
    statement: &str,
    params: &[Value],
) -> DbResult<QueryResult> {
    let mut guard = handle.lock().await;
    let conn = guard.as_mut().ok_or_else(not_connected)?;
    execute(conn, statement, params).await
}

/// Run a transaction-control statement on the shared handle.
async fn run_control(handle: &SharedHandle, statement: &str) -> DbResult<()> {
    let mut guard = handle.lock().await;
    let conn = guard.as_mut().ok_or_else(not_connected)?;
    sqlx::query(statement)
        .execute(&mut *conn)
        .await
        .map(|_| ())
        .map_err(|e| {
            error!(backend = BACKEND, sql = statement, error = %e, "Query failed");
            query_failed(e, statement)
        })
}

async fn ping(handle: &SharedHandle) -> bool {
    let mut guard = handle.lock().await;
    match guard.as_mut() {
        Some(conn) => sqlx::query("SELECT 1").fetch_one(&mut *conn).await.is_ok(),
        None => false,
    }
}

impl Queryable for SqliteAdapter {
    type Params = Vec<Value>;
    type Transaction = SqliteTransaction;

    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn query(&self, statement: &str, params: Vec<Value>) -> DbResult<QueryResult> {
        execute_shared(&self.conn, statement, &params).await
    }

    async fn transaction<T, F>(&self, body: F) -> DbResult<T>
    where
        F: AsyncFnOnce(&SqliteTransaction) -> DbResult<T>,
    {
        run_transaction(self.begin().await?, body).await
    }

    async fn health_check(&self) -> bool {
        ping(&self.conn).await
    }
}

impl DatabaseAdapter for SqliteAdapter {
    async fn connect(&self) -> DbResult<()> {
        let mut guard = self.conn.lock_raw().await;
        if guard.is_some() {
            warn!(backend = BACKEND, "Already connected to SQLite");
            return Ok(());
        }

        let conn = match self.connect_options() {
            Ok(options) => options.connect().await,
            Err(e) => Err(e),
        }
        .map_err(|e| {
            error!(backend = BACKEND, filename = %self.config.filename, error = %e, "Failed to connect to SQLite");
            DbError::connection(format!("SQLite connection failed: {}", e))
        })?;

        *guard = Some(conn);
        info!(backend = BACKEND, filename = %self.config.filename, "Connected to SQLite");
        Ok(())
    }

    async fn disconnect(&self) -> DbResult<()> {
        let conn = self.conn.lock_raw().await.take();
        if let Some(conn) = conn {
            conn.close().await.map_err(|e| {
                error!(backend = BACKEND, error = %e, "Failed to close SQLite connection");
                DbError::connection(format!("SQLite disconnect failed: {}", e))
            })?;
            info!(backend = BACKEND, "Disconnected from SQLite");
        }
        Ok(())
    }
}

/// A transaction open on the adapter's shared handle.
///
/// Commit and rollback are `COMMIT` / `ROLLBACK` statements on that handle.
/// Dropped unreleased, it flags the handle for rollback on next use.
pub struct SqliteTransaction {
    conn: SharedHandle,
    released: bool,
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if !self.released {
            warn!(backend = BACKEND, "Transaction dropped while open");
            self.conn.abandoned.store(true, Ordering::Release);
        }
    }
}

impl Queryable for SqliteTransaction {
    type Params = Vec<Value>;
    type Transaction = SqliteTransaction;

    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn query(&self, statement: &str, params: Vec<Value>) -> DbResult<QueryResult> {
        execute_shared(&self.conn, statement, &params).await
    }

    async fn transaction<T, F>(&self, body: F) -> DbResult<T>
    where
        F: AsyncFnOnce(&SqliteTransaction) -> DbResult<T>,
    {
        debug!(backend = BACKEND, "Reusing open transaction");
        body(self).await
    }

    async fn health_check(&self) -> bool {
        ping(&self.conn).await
    }
}

impl TransactionControl for SqliteTransaction {
    async fn commit(&self) -> DbResult<()> {
        run_control(&self.conn, "COMMIT").await
    }

    async fn rollback(&self) -> DbResult<()> {
        run_control(&self.conn, "ROLLBACK").await
    }

    async fn release(mut self) {
        self.released = true;
    }
}
