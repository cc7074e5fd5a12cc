//! The `Model` trait and its provided CRUD operations.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::schema::{EntitySchema, ID_COLUMN, validate_model_schema};
use crate::db::{BackendKind, DbError, DbResult, QueryResult, Queryable, Row};
use crate::query::{PlaceholderStyle, QueryBuilder};

fn to_fields<M: Serialize>(model: &M, schema: &EntitySchema) -> DbResult<Row> {
    match serde_json::to_value(model) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(DbError::validation(format!(
            "Model for {} must serialize to an object",
            schema.table
        ))),
        Err(e) => Err(DbError::validation(format!(
            "Failed to serialize model for {}: {}",
            schema.table, e
        ))),
    }
}

fn from_row<M: DeserializeOwned>(row: &Row, schema: &EntitySchema) -> DbResult<M> {
    serde_json::from_value(Value::Object(schema.row_to_fields(row))).map_err(|e| {
        DbError::query(
            format!("Failed to decode {} row: {}", schema.table, e),
            None,
        )
    })
}

/// Id produced by an INSERT: the driver's last insert id, else an `id` row.
fn inserted_id(result: &QueryResult) -> Option<i64> {
    result.last_insert_id_i64().or_else(|| {
        result
            .first()
            .and_then(|row| row.get(ID_COLUMN))
            .and_then(Value::as_i64)
    })
}

/// The model layer generates SQL; document backends are rejected up front.
fn require_sql(kind: BackendKind, schema: &EntitySchema) -> DbResult<()> {
    if kind.is_sql() {
        Ok(())
    } else {
        Err(DbError::validation(format!(
            "Model {} requires a SQL backend, got {}",
            schema.table, kind
        )))
    }
}

/// `UPDATE ... WHERE id = ?` for the given column values.
///
/// Nulls are written as a literal `NULL` rather than bound, since an untyped
/// null parameter does not coerce to every column type on PostgreSQL.
pub(crate) fn update_statement(
    schema: &EntitySchema,
    style: PlaceholderStyle,
    values: Vec<(&str, Value)>,
    id: i64,
) -> (String, Vec<Value>) {
    let mut params = Vec::with_capacity(values.len() + 1);
    let assignments: Vec<String> = values
        .into_iter()
        .map(|(column, value)| {
            if value.is_null() {
                format!("{} = NULL", column)
            } else {
                params.push(value);
                format!("{} = {}", column, style.placeholder(params.len()))
            }
        })
        .collect();
    params.push(Value::from(id));

    let statement = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        schema.table,
        assignments.join(", "),
        ID_COLUMN,
        style.placeholder(params.len())
    );
    (statement, params)
}

/// `INSERT` for the non-null column values; PostgreSQL returns the new id.
pub(crate) fn insert_statement(
    schema: &EntitySchema,
    kind: BackendKind,
    values: Vec<(&str, Value)>,
) -> (String, Vec<Value>) {
    // Unset fields are left to column defaults.
    let values: Vec<(&str, Value)> = values.into_iter().filter(|(_, v)| !v.is_null()).collect();
    let style = PlaceholderStyle::for_backend(kind);

    let mut statement = if values.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", schema.table)
    } else {
        let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
        let placeholders: Vec<String> = (1..=values.len()).map(|i| style.placeholder(i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.table,
            columns.join(", "),
            placeholders.join(", ")
        )
    };
    if kind == BackendKind::Postgres {
        statement.push_str(&format!(" RETURNING {}", ID_COLUMN));
    }
    (statement, values.into_iter().map(|(_, v)| v).collect())
}

/// A record persisted in one table.
///
/// Implementors supply the schema and id accessors; the data operations are
/// provided and work with any SQL backend. A MongoDB handle is rejected with
/// a validation error.
#[allow(async_fn_in_trait)]
pub trait Model: Serialize + DeserializeOwned + Sized {
    fn schema() -> &'static EntitySchema;

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// Load the record with `id`, if it exists.
    async fn find<Q>(db: &Q, id: i64) -> DbResult<Option<Self>>
    where
        Q: Queryable,
        Q::Params: From<Vec<Value>>,
    {
        let schema = Self::schema();
        validate_model_schema(schema)?;
        require_sql(db.kind(), schema)?;

        let result = QueryBuilder::for_backend(schema.table, db.kind())
            .select(schema.column_names())
            .where_clause(ID_COLUMN, "=", id)
            .execute(db)
            .await?;

        result.first().map(|row| from_row(row, schema)).transpose()
    }

    async fn find_all<Q>(db: &Q) -> DbResult<Vec<Self>>
    where
        Q: Queryable,
        Q::Params: From<Vec<Value>>,
    {
        let schema = Self::schema();
        validate_model_schema(schema)?;
        require_sql(db.kind(), schema)?;

        let result = QueryBuilder::for_backend(schema.table, db.kind())
            .select(schema.column_names())
            .execute(db)
            .await?;

        result.rows.iter().map(|row| from_row(row, schema)).collect()
    }

    /// INSERT when the model has no id, UPDATE otherwise.
    ///
    /// After an INSERT the generated id is written back with `set_id`. An
    /// INSERT skips null fields; an UPDATE sets them to `NULL`.
    async fn save<Q>(&mut self, db: &Q) -> DbResult<()>
    where
        Q: Queryable,
        Q::Params: From<Vec<Value>>,
    {
        let schema = Self::schema();
        validate_model_schema(schema)?;
        require_sql(db.kind(), schema)?;

        let fields = to_fields(&*self, schema)?;
        let values = schema.column_values(&fields);

        match self.id() {
            Some(id) => {
                if values.is_empty() {
                    debug!(table = schema.table, id, "Nothing to update");
                    return Ok(());
                }
                let (statement, params) = update_statement(
                    schema,
                    PlaceholderStyle::for_backend(db.kind()),
                    values,
                    id,
                );

                debug!(table = schema.table, id, "Updating model");
                db.query(&statement, params.into()).await?;
            }
            None => {
                let (statement, params) = insert_statement(schema, db.kind(), values);

                debug!(table = schema.table, "Inserting model");
                let result = db.query(&statement, params.into()).await?;
                if let Some(id) = inserted_id(&result) {
                    self.set_id(id);
                }
            }
        }

        Ok(())
    }

    /// Delete this record. Fails if the model has never been saved.
    async fn delete<Q>(&self, db: &Q) -> DbResult<()>
    where
        Q: Queryable,
        Q::Params: From<Vec<Value>>,
    {
        let schema = Self::schema();
        validate_model_schema(schema)?;
        require_sql(db.kind(), schema)?;

        let Some(id) = self.id() else {
            return Err(DbError::validation(format!(
                "Cannot delete {} model without id",
                schema.table
            )));
        };

        let statement = format!(
            "DELETE FROM {} WHERE {} = {}",
            schema.table,
            ID_COLUMN,
            PlaceholderStyle::for_backend(db.kind()).placeholder(1)
        );

        debug!(table = schema.table, id, "Deleting model");
        db.query(&statement, vec![Value::from(id)].into()).await?;
        Ok(())
    }

    /// Save a new record and return it with its id set.
    async fn create<Q>(db: &Q, mut value: Self) -> DbResult<Self>
    where
        Q: Queryable,
        Q::Params: From<Vec<Value>>,
    {
        value.save(db).await?;
        Ok(value)
    }
}
