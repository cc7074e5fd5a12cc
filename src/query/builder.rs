//! String-building SELECT queries with positional parameters.
//!
//! Identifiers and operators are inserted verbatim; only values travel as
//! bound parameters.

use std::fmt;

use serde_json::Value;

use crate::db::{BackendKind, DbResult, QueryResult, Queryable};

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

/// How parameter placeholders are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ...
    #[default]
    Numbered,
    /// `?`
    QuestionMark,
}

impl PlaceholderStyle {
    /// Native placeholder style for a backend.
    pub fn for_backend(kind: BackendKind) -> Self {
        match kind {
            BackendKind::MySql | BackendKind::Sqlite => PlaceholderStyle::QuestionMark,
            BackendKind::Postgres | BackendKind::MongoDb => PlaceholderStyle::Numbered,
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            PlaceholderStyle::Numbered => format!("${}", index),
            PlaceholderStyle::QuestionMark => "?".to_string(),
        }
    }
}

/// Builds `SELECT <fields> FROM <table> [WHERE ...] [ORDER BY ...] [LIMIT n] [OFFSET n]`.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    fields: Vec<String>,
    conditions: Vec<String>,
    params: Vec<Value>,
    order_by: Option<(String, Direction)>,
    limit: Option<u64>,
    offset: Option<u64>,
    style: PlaceholderStyle,
}

impl QueryBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: vec!["*".to_string()],
            conditions: Vec::new(),
            params: Vec::new(),
            order_by: None,
            limit: None,
            offset: None,
            style: PlaceholderStyle::default(),
        }
    }

    /// Use the placeholder style native to `kind`.
    pub fn for_backend(table: impl Into<String>, kind: BackendKind) -> Self {
        Self::new(table).placeholders(PlaceholderStyle::for_backend(kind))
    }

    pub fn placeholders(mut self, style: PlaceholderStyle) -> Self {
        self.style = style;
        self
    }

    /// Replace the selected fields. An empty list selects `*`.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        if self.fields.is_empty() {
            self.fields.push("*".to_string());
        }
        self
    }

    /// Add `column operator <placeholder>`; conditions are AND-joined.
    pub fn where_clause(
        mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        let placeholder = self.style.placeholder(self.params.len() + 1);
        self.conditions
            .push(format!("{} {} {}", column, operator, placeholder));
        self.params.push(value.into());
        self
    }

    /// Set the sort column. A later call replaces an earlier one.
    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order_by = Some((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }

    pub fn offset(mut self, count: u64) -> Self {
        self.offset = Some(count);
        self
    }

    pub fn build(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.fields.join(", "), self.table);
        if !self.conditions.is_empty() {
            sql.push_str(&format!(" WHERE {}", self.conditions.join(" AND ")));
        }
        if let Some((column, direction)) = &self.order_by {
            sql.push_str(&format!(" ORDER BY {} {}", column, direction));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        sql
    }

    /// Values bound by `where_clause`, in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Build the statement and run it with the collected parameters.
    pub async fn execute<Q>(&self, db: &Q) -> DbResult<QueryResult>
    where
        Q: Queryable,
        Q::Params: From<Vec<Value>>,
    {
        db.query(&self.build(), self.params.clone().into()).await
    }
}
