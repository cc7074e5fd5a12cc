//! Fluent SELECT builder over any [`Queryable`](crate::db::Queryable).

mod builder;


pub use builder::{Direction, PlaceholderStyle, QueryBuilder};
