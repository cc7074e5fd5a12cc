//! Static table and column mapping for models.

use serde_json::Value;

use crate::db::{DbError, DbResult, Row};

/// Primary key column every model table has.
pub const ID_COLUMN: &str = "id";

/// Storage type of a column, used to normalise values read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnType {
    Integer,
    Real,
    #[default]
    Text,
    /// Stored as an integer by backends without a native boolean.
    Boolean,
    /// Stored as JSON (or JSON text).
    Json,
}

impl ColumnType {
    fn decode(self, value: Value) -> Value {
        match (self, value) {
            (ColumnType::Boolean, Value::Number(n)) => Value::Bool(n.as_i64() != Some(0)),
            (ColumnType::Json, Value::String(text)) => {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            (_, value) => value,
        }
    }
}

/// Maps one model field to one table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Field name in the serialised model.
    pub field: &'static str,
    /// Column name in the table.
    pub column: &'static str,
    pub kind: ColumnType,
}

impl ColumnDef {
    /// A text column named after its field.
    pub const fn new(field: &'static str) -> Self {
        Self {
            field,
            column: field,
            kind: ColumnType::Text,
        }
    }

    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = column;
        self
    }

    pub const fn kind(mut self, kind: ColumnType) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_id(&self) -> bool {
        self.column == ID_COLUMN
    }
}

/// Table name plus ordered column mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    pub table: &'static str,
    pub columns: &'static [ColumnDef],
}

impl EntitySchema {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.column).collect()
    }

    /// Re-key a result row from column names to field names.
    pub(crate) fn row_to_fields(&self, row: &Row) -> Row {
        let mut fields = Row::new();
        for def in self.columns {
            if let Some(value) = row.get(def.column) {
                fields.insert(def.field.to_string(), def.kind.decode(value.clone()));
            }
        }
        fields
    }

    /// Pair each non-id column with the model's value for its field.
    pub(crate) fn column_values(&self, fields: &Row) -> Vec<(&'static str, Value)> {
        self.columns
            .iter()
            .filter(|def| !def.is_id())
            .map(|def| {
                let value = fields.get(def.field).cloned().unwrap_or(Value::Null);
                (def.column, value)
            })
            .collect()
    }
}

/// Check a schema before any SQL is built from it.
pub fn validate_model_schema(schema: &EntitySchema) -> DbResult<()> {
    if schema.table.trim().is_empty() {
        return Err(DbError::validation("Model schema requires a table name"));
    }
    if schema.columns.is_empty() {
        return Err(DbError::validation(format!(
            "Model schema for {} requires at least one column",
            schema.table
        )));
    }
    if let Some(def) = schema
        .columns
        .iter()
        .find(|def| def.field.is_empty() || def.column.is_empty())
    {
        return Err(DbError::validation(format!(
            "Model schema for {} has an unnamed column ({:?})",
            schema.table, def
        )));
    }
    Ok(())
}
