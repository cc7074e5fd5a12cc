//! Active-record style persistence over the adapter contract.
//!
//! A model declares its table and column mapping up front in an
//! [`EntitySchema`]; the provided [`Model`] operations build SQL from that
//! schema and run it through any SQL [`Queryable`](crate::db::Queryable).

mod entity;
mod schema;

#[cfg(test)]
mod entity_test;
#[cfg(test)]
mod schema_test;

pub use entity::Model;
pub use schema::{ColumnDef, ColumnType, EntitySchema, ID_COLUMN, validate_model_schema};
