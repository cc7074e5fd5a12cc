//! Shared utilities for CLI commands

use serde_json::Value;
use tabled::{Table, builder::Builder, settings::Style};

use crate::cli::error::CliResult;
use crate::db::QueryResult;

/// Truncate a string with ellipsis if it exceeds max length
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}

/// Apply consistent table styling
pub fn apply_table_style(table: &mut Table) {
    table.with(Style::rounded());
}

/// Render one cell. Strings print bare, null prints as `-`.
pub fn format_cell(value: &Value) -> String {
    let text = match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate_with_ellipsis(&text, 50)
}

/// Parse a `--param` value as JSON, or take it as a plain string.
pub fn parse_param(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Render a result as a table, or as pretty JSON when `format` is `json`.
pub fn render_result(result: &QueryResult, format: &str) -> CliResult<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(result)?),
        _ => Ok(format_table(result)),
    }
}

fn format_table(result: &QueryResult) -> String {
    if result.rows.is_empty() {
        return match (result.rows_affected, &result.last_insert_id) {
            (Some(n), Some(id)) => format!("{} row(s) affected, last insert id {}", n, format_cell(id)),
            (Some(n), None) => format!("{} row(s) affected", n),
            _ => "No rows returned.".to_string(),
        };
    }

    // Columns in first-seen order across all rows.
    let mut columns: Vec<&str> = Vec::new();
    for row in &result.rows {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().copied());
    for row in &result.rows {
        builder.push_record(
            columns
                .iter()
                .map(|c| row.get(*c).map(format_cell).unwrap_or_else(|| "-".to_string())),
        );
    }

    let mut table = builder.build();
    apply_table_style(&mut table);
    table.to_string()
}
