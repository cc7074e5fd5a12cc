//! SQLite implementation of the adapter contract.
//!
//! One file-backed (or `:memory:`) connection shared by every caller.

mod connection;
mod helpers;

#[cfg(test)]
mod connection_test;

pub use connection::{SqliteAdapter, SqliteTransaction};
pub use helpers::is_mutation;
