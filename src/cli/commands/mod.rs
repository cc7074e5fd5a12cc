pub mod document;
pub mod health;
pub mod query;
