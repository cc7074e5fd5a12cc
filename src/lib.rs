pub mod cli;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
