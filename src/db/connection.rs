//! Connection façade owning one adapter for its lifetime.

use serde_json::Value;

use crate::db::{
    Adapter, BackendConfig, BackendKind, DatabaseAdapter, DbResult, Queryable,
    validate_backend_config, validate_connection_config,
};

/// Entry point for application code.
///
/// The backend is fixed at construction, after the config has been
/// validated; everything else forwards to the owned [`Adapter`].
pub struct Connection {
    adapter: Adapter,
}

impl Connection {
    /// Validate a typed config and build its adapter.
    pub fn new(config: BackendConfig) -> DbResult<Self> {
        validate_backend_config(&config)?;
        Ok(Self {
            adapter: Adapter::from_config(config),
        })
    }

    /// Validate an untyped config for a backend tag and build its adapter.
    ///
    /// `tag` is one of `postgres`, `mysql`, `sqlite`, `mongodb`.
    pub fn from_value(tag: &str, config: &Value) -> DbResult<Self> {
        let kind = validate_connection_config(tag, config)?;
        let config = BackendConfig::from_parts(kind, config)?;
        Ok(Self {
            adapter: Adapter::from_config(config),
        })
    }

    pub fn kind(&self) -> BackendKind {
        self.adapter.kind()
    }

    pub async fn connect(&self) -> DbResult<()> {
        self.adapter.connect().await
    }

    pub async fn disconnect(&self) -> DbResult<()> {
        self.adapter.disconnect().await
    }

    /// The live adapter, for queries and transactions.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub async fn health_check(&self) -> bool {
        self.adapter.health_check().await
    }
}
