use serde_json::Value;

use crate::cli::error::CliResult;
use crate::cli::utils::{parse_param, render_result};
use crate::db::{Connection, Queryable};

/// Run one SQL statement with positional parameters.
pub async fn run_query(
    conn: &Connection,
    statement: &str,
    params: &[String],
    format: &str,
) -> CliResult<String> {
    let values: Vec<Value> = params.iter().map(|p| parse_param(p)).collect();
    let result = conn.adapter().query(statement, values.into()).await?;
    render_result(&result, format)
}
