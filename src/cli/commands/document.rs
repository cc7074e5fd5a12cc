use crate::cli::error::CliResult;
use crate::cli::utils::render_result;
use crate::db::{Connection, DocumentOperation, Queryable};

/// Run one document operation, given as JSON, against a collection.
///
/// `operation` is e.g. `{"find": {"name": "x"}}` or `{"insertOne": {...}}`.
pub async fn run_document(
    conn: &Connection,
    collection: &str,
    operation: &str,
    format: &str,
) -> CliResult<String> {
    let operation = DocumentOperation::from_value(serde_json::from_str(operation)?)?;
    let result = conn.adapter().query(collection, operation.into()).await?;
    render_result(&result, format)
}
