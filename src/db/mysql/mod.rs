//! MySQL implementation of the adapter contract.

mod connection;
mod decode;


pub use connection::{MySqlAdapter, MySqlTransaction};
