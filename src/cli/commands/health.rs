use crate::cli::error::{CliError, CliResult};
use crate::db::Connection;

/// Check the connection; an unhealthy backend is an error.
pub async fn check_health(conn: &Connection) -> CliResult<String> {
    if conn.health_check().await {
        Ok(format!("{}: healthy", conn.kind()))
    } else {
        Err(CliError::Unhealthy {
            backend: conn.kind().to_string(),
        })
    }
}
