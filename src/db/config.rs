//! Backend selection and per-backend connection settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

const DEFAULT_POOL_SIZE: u32 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Closed set of supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Postgres,
    MySql,
    Sqlite,
    MongoDb,
}

impl BackendKind {
    /// The literal tag used in configuration documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::MySql => "mysql",
            BackendKind::Sqlite => "sqlite",
            BackendKind::MongoDb => "mongodb",
        }
    }

    /// True for backends that speak SQL.
    pub fn is_sql(&self) -> bool {
        !matches!(self, BackendKind::MongoDb)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(BackendKind::Postgres),
            "mysql" => Ok(BackendKind::MySql),
            "sqlite" => Ok(BackendKind::Sqlite),
            "mongodb" => Ok(BackendKind::MongoDb),
            other => Err(DbError::validation(format!(
                "Unsupported database type: {}",
                other
            ))),
        }
    }
}

/// PostgreSQL pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

impl PostgresConfig {
    pub fn pool_size(&self) -> u32 {
        self.max_connections.unwrap_or(DEFAULT_POOL_SIZE)
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }
}

/// MySQL pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

impl MySqlConfig {
    pub fn pool_size(&self) -> u32 {
        self.connection_limit.unwrap_or(DEFAULT_POOL_SIZE)
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }
}

/// Embedded SQLite file settings.
///
/// `:memory:` opens a private in-memory database that lives as long as the
/// adapter's connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqliteConfig {
    pub filename: String,
}

impl SqliteConfig {
    pub fn in_memory() -> Self {
        Self {
            filename: ":memory:".to_string(),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.filename == ":memory:"
    }
}

/// MongoDB client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoConfig {
    pub url: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pool_size: Option<u32>,
}

impl MongoConfig {
    pub fn pool_size(&self) -> u32 {
        self.max_pool_size.unwrap_or(DEFAULT_POOL_SIZE)
    }
}

/// Connection settings keyed by backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Postgres(PostgresConfig),
    MySql(MySqlConfig),
    Sqlite(SqliteConfig),
    MongoDb(MongoConfig),
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Postgres(_) => BackendKind::Postgres,
            BackendConfig::MySql(_) => BackendKind::MySql,
            BackendConfig::Sqlite(_) => BackendKind::Sqlite,
            BackendConfig::MongoDb(_) => BackendKind::MongoDb,
        }
    }

    /// Build a typed config from a tag and an untyped settings object.
    ///
    /// The settings must already have passed
    /// [`validate_connection_config`](crate::db::validate_connection_config).
    pub(crate) fn from_parts(kind: BackendKind, settings: &serde_json::Value) -> DbResult<Self> {
        let settings = settings.clone();
        let parsed = match kind {
            BackendKind::Postgres => serde_json::from_value(settings).map(BackendConfig::Postgres),
            BackendKind::MySql => serde_json::from_value(settings).map(BackendConfig::MySql),
            BackendKind::Sqlite => serde_json::from_value(settings).map(BackendConfig::Sqlite),
            BackendKind::MongoDb => serde_json::from_value(settings).map(BackendConfig::MongoDb),
        };
        parsed.map_err(|e| DbError::validation(format!("Invalid config for {}: {}", kind, e)))
    }
}

impl From<PostgresConfig> for BackendConfig {
    fn from(config: PostgresConfig) -> Self {
        BackendConfig::Postgres(config)
    }
}

impl From<MySqlConfig> for BackendConfig {
    fn from(config: MySqlConfig) -> Self {
        BackendConfig::MySql(config)
    }
}

impl From<SqliteConfig> for BackendConfig {
    fn from(config: SqliteConfig) -> Self {
        BackendConfig::Sqlite(config)
    }
}

impl From<MongoConfig> for BackendConfig {
    fn from(config: MongoConfig) -> Self {
        BackendConfig::MongoDb(config)
    }
}
