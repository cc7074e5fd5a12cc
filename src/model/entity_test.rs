use serde::{Deserialize, Serialize};
use serde_json::json;

use super::entity::{insert_statement, update_statement};
use crate::db::{
    BackendKind, Connection, DatabaseAdapter, DbError, Queryable, SqliteAdapter, SqliteConfig,
};
use crate::model::{ColumnDef, ColumnType, EntitySchema, Model};
use crate::query::PlaceholderStyle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    #[serde(default)]
    id: Option<i64>,
    name: String,
    email: Option<String>,
    active: bool,
    #[serde(default)]
    tags: Vec<String>,
}

static USER_COLUMNS: [ColumnDef; 5] = [
    ColumnDef::new("id").kind(ColumnType::Integer),
    ColumnDef::new("name"),
    ColumnDef::new("email").column("email_address"),
    ColumnDef::new("active").kind(ColumnType::Boolean),
    ColumnDef::new("tags").kind(ColumnType::Json),
];

static USER_SCHEMA: EntitySchema = EntitySchema {
    table: "users",
    columns: &USER_COLUMNS,
};

impl Model for User {
    fn schema() -> &'static EntitySchema {
        &USER_SCHEMA
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

fn user(name: &str) -> User {
    User {
        id: None,
        name: name.to_string(),
        email: None,
        active: true,
        tags: vec!["a".to_string()],
    }
}

async fn setup() -> SqliteAdapter {
    let adapter = SqliteAdapter::new(SqliteConfig::in_memory());
    adapter.connect().await.expect("Connect should succeed");
    adapter
        .query(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email_address TEXT,
                active INTEGER NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]'
            )",
            vec![],
        )
        .await
        .expect("Create should succeed");
    adapter
}

#[tokio::test(flavor = "multi_thread")]
async fn create_assigns_id_and_find_loads_it() {
    let db = setup().await;

    let created = User::create(&db, user("ada")).await.expect("Create should succeed");
    assert_eq!(created.id, Some(1));

    let found = User::find(&db, 1)
        .await
        .expect("Find should succeed")
        .expect("User should exist");
    assert_eq!(found, created);
}

#[tokio::test(flavor = "multi_thread")]
async fn find_missing_returns_none() {
    let db = setup().await;
    assert_eq!(User::find(&db, 42).await.expect("Find should succeed"), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn save_with_id_updates_in_place() {
    let db = setup().await;
    let mut ada = User::create(&db, user("ada")).await.expect("Create should succeed");

    ada.email = Some("ada@example.com".to_string());
    ada.active = false;
    ada.save(&db).await.expect("Update should succeed");

    let raw = db
        .query("SELECT email_address, active FROM users WHERE id = ?", vec![json!(1)])
        .await
        .expect("Select should succeed");
    assert_eq!(raw.rows[0].get("email_address"), Some(&json!("ada@example.com")));
    assert_eq!(raw.rows[0].get("active"), Some(&json!(0)));

    let all = User::find_all(&db).await.expect("Find all should succeed");
    assert_eq!(all, vec![ada]);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_removes_row() {
    let db = setup().await;
    let ada = User::create(&db, user("ada")).await.expect("Create should succeed");
    User::create(&db, user("bob")).await.expect("Create should succeed");

    ada.delete(&db).await.expect("Delete should succeed");

    let names: Vec<String> = User::find_all(&db)
        .await
        .expect("Find all should succeed")
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, vec!["bob".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_without_id_is_a_validation_error() {
    let db = setup().await;
    let err = user("ghost")
        .delete(&db)
        .await
        .expect_err("Delete should fail");
    assert!(matches!(err, DbError::Validation { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn models_work_inside_a_transaction() {
    let db = setup().await;

    let err = db
        .transaction(async |tx| {
            User::create(tx, user("temp")).await?;
            Err::<(), _>(DbError::validation("abort"))
        })
        .await
        .expect_err("Transaction should roll back");
    assert!(matches!(err, DbError::Validation { .. }));

    assert!(User::find_all(&db).await.expect("Find all should succeed").is_empty());
}

#[test]
fn update_writes_null_as_literal_and_renumbers() {
    let values = vec![
        ("name", json!("ada")),
        ("email_address", json!(null)),
        ("active", json!(true)),
    ];

    let (statement, params) = update_statement(&USER_SCHEMA, PlaceholderStyle::Numbered, values, 7);

    assert_eq!(
        statement,
        "UPDATE users SET name = $1, email_address = NULL, active = $2 WHERE id = $3"
    );
    assert_eq!(params, vec![json!("ada"), json!(true), json!(7)]);
}

#[test]
fn insert_skips_nulls_and_returns_id_on_postgres() {
    let values = vec![("name", json!("ada")), ("email_address", json!(null))];

    let (statement, params) = insert_statement(&USER_SCHEMA, BackendKind::Postgres, values);

    assert_eq!(statement, "INSERT INTO users (name) VALUES ($1) RETURNING id");
    assert_eq!(params, vec![json!("ada")]);
}

#[test]
fn insert_of_all_nulls_uses_defaults() {
    let (statement, params) =
        insert_statement(&USER_SCHEMA, BackendKind::Sqlite, vec![("name", json!(null))]);

    assert_eq!(statement, "INSERT INTO users DEFAULT VALUES");
    assert!(params.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn save_clears_field_to_null() {
    let db = setup().await;
    let mut ada = user("ada");
    ada.email = Some("ada@example.com".to_string());
    let mut ada = User::create(&db, ada).await.expect("Create should succeed");

    ada.email = None;
    ada.save(&db).await.expect("Update should succeed");

    let found = User::find(&db, 1)
        .await
        .expect("Find should succeed")
        .expect("User should exist");
    assert_eq!(found.email, None);
    assert_eq!(found, ada);
}

#[tokio::test(flavor = "multi_thread")]
async fn document_backend_is_rejected() {
    let conn = Connection::from_value(
        "mongodb",
        &json!({"url": "mongodb://localhost:27017", "database": "app"}),
    )
    .expect("Config should be valid");

    let err = User::find_all(conn.adapter())
        .await
        .expect_err("Model on MongoDB should fail");
    assert!(
        matches!(&err, DbError::Validation { message } if message == "Model users requires a SQL backend, got mongodb"),
        "unexpected error: {err:?}"
    );

    let err = user("ada")
        .save(conn.adapter())
        .await
        .expect_err("Save on MongoDB should fail");
    assert!(matches!(err, DbError::Validation { .. }));
}
