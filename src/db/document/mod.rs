//! MongoDB (document-session) implementation of the adapter contract.

mod connection;
mod operation;


pub use connection::{MongoAdapter, MongoTransaction};
pub use operation::{DocumentOperation, JsonObject};
