//! Backend-agnostic data access.
//!
//! This module provides one adapter contract over several storage backends
//! (PostgreSQL, MySQL, SQLite, MongoDB), so application code can connect,
//! query and run transactions without knowing which backend is configured.
//!
//! # Architecture
//!
//! - `error`: the three error kinds every adapter reports
//! - `config` / `validator`: backend tags, per-backend settings, pre-flight checks
//! - `adapter`: the `Queryable` / `DatabaseAdapter` traits and result types
//! - `transaction`: the commit/rollback/release protocol shared by all backends
//! - `handle` / `sql`: the live-handle slot and sqlx helpers shared by the SQL and document adapters
//! - `postgres`, `mysql`, `sqlite`, `document`: one adapter per backend
//! - `backend`: the `Adapter` tagged union
//! - `connection`: the `Connection` façade

mod adapter;
mod backend;
mod config;
mod connection;
mod document;
mod error;
mod handle;
mod mysql;
mod postgres;
mod sql;
mod sqlite;
mod transaction;
mod validator;

#[cfg(test)]
mod handle_test;

pub use adapter::{DatabaseAdapter, Params, QueryResult, Queryable, Row};
pub use backend::{Adapter, TransactionContext};
pub use config::{
    BackendConfig, BackendKind, MongoConfig, MySqlConfig, PostgresConfig, SqliteConfig,
};
pub use connection::Connection;
pub use document::{DocumentOperation, JsonObject, MongoAdapter, MongoTransaction};
pub use error::{DbError, DbResult};
pub use mysql::{MySqlAdapter, MySqlTransaction};
pub use postgres::{PostgresAdapter, PostgresTransaction};
pub use sqlite::{SqliteAdapter, SqliteTransaction, is_mutation};
pub use validator::{validate_backend_config, validate_connection_config};
