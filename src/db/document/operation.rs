//! Document-store operation descriptors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::{DbError, DbResult};

/// A JSON object used as a filter, document or update.
pub type JsonObject = Map<String, Value>;

/// One operation against a collection.
///
/// Serialised externally tagged, so the wire shapes are
/// `{"find": filter}`, `{"insertOne": document}`,
/// `{"updateOne": {"filter": ..., "update": ...}}` and `{"deleteOne": filter}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentOperation {
    Find(JsonObject),
    InsertOne(JsonObject),
    UpdateOne {
        filter: JsonObject,
        update: JsonObject,
    },
    DeleteOne(JsonObject),
}

impl DocumentOperation {
    /// Parse an untyped descriptor. Any unrecognised shape is a query error.
    pub fn from_value(value: Value) -> DbResult<Self> {
        let shape = value.to_string();
        serde_json::from_value(value).map_err(|e| {
            DbError::query(
                format!("MongoDB operation failed: Unsupported operation ({})", e),
                Some(&shape),
            )
        })
    }

    /// The driver-level name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            DocumentOperation::Find(_) => "find",
            DocumentOperation::InsertOne(_) => "insertOne",
            DocumentOperation::UpdateOne { .. } => "updateOne",
            DocumentOperation::DeleteOne(_) => "deleteOne",
        }
    }

    /// Whether the operation changes data.
    pub fn is_write(&self) -> bool {
        !matches!(self, DocumentOperation::Find(_))
    }
}
