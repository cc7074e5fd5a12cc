use miette::Diagnostic;
use thiserror::Error;

use crate::db::DbError;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error("No database configuration given")]
    #[diagnostic(
        code(unidb::cli::missing_config),
        help("Pass --config <FILE> or set UNIDB_CONFIG to a YAML or JSON config file.")
    )]
    MissingConfig,

    #[error("Failed to read config file {path}")]
    #[diagnostic(code(unidb::cli::config_io))]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {message}")]
    #[diagnostic(
        code(unidb::cli::invalid_config),
        help("The config needs a `type` field (postgres, mysql, sqlite or mongodb) plus that backend's settings.")
    )]
    InvalidConfig { path: String, message: String },

    #[error("Invalid JSON argument: {message}")]
    #[diagnostic(code(unidb::cli::invalid_argument))]
    InvalidArgument { message: String },

    #[error("Database is not healthy ({backend})")]
    #[diagnostic(code(unidb::cli::unhealthy))]
    Unhealthy { backend: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::InvalidArgument {
            message: e.to_string(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
