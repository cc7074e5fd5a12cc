//! Tests for the SQLite adapter.

use std::time::Duration;

use serde_json::json;

use crate::db::{DatabaseAdapter, DbError, Queryable, SqliteAdapter, SqliteConfig};

async fn setup_adapter() -> SqliteAdapter {
    let adapter = SqliteAdapter::new(SqliteConfig::in_memory());
    adapter.connect().await.expect("Connect should succeed");
    adapter
        .query("CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)", vec![])
        .await
        .expect("Create table should succeed");
    adapter
}

async fn count_rows(adapter: &SqliteAdapter) -> i64 {
    let result = adapter
        .query("SELECT COUNT(*) AS n FROM t", vec![])
        .await
        .expect("Count should succeed");
    result.rows[0]["n"].as_i64().expect("count is an integer")
}

#[tokio::test(flavor = "multi_thread")]
async fn insert_then_select_round_trip() {
    let adapter = setup_adapter().await;

    let inserted = adapter
        .query("INSERT INTO t (v) VALUES (?)", vec![json!("hello")])
        .await
        .expect("Insert should succeed");
    assert_eq!(inserted.last_insert_id_i64(), Some(1));
    assert_eq!(inserted.rows_affected, Some(1));
    assert!(inserted.rows.is_empty());

    let selected = adapter
        .query("SELECT * FROM t WHERE id = ?", vec![json!(1)])
        .await
        .expect("Select should succeed");
    assert_eq!(selected.rows.len(), 1);
    assert_eq!(selected.rows[0]["id"], json!(1));
    assert_eq!(selected.rows[0]["v"], json!("hello"));
    assert_eq!(selected.rows_affected, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn lowercase_insert_takes_mutation_path() {
    let adapter = setup_adapter().await;

    let result = adapter
        .query("insert into t values (1, 'x')", vec![])
        .await
        .expect("Insert should succeed");

    assert!(result.rows.is_empty());
    assert_eq!(result.last_insert_id_i64(), Some(1));
    assert_eq!(result.rows_affected, Some(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn update_and_delete_report_affected_rows() {
    let adapter = setup_adapter().await;
    for v in ["a", "b", "c"] {
        adapter
            .query("INSERT INTO t (v) VALUES (?)", vec![json!(v)])
            .await
            .expect("Insert should succeed");
    }

    let updated = adapter
        .query("UPDATE t SET v = ? WHERE id > ?", vec![json!("z"), json!(1)])
        .await
        .expect("Update should succeed");
    assert_eq!(updated.rows_affected, Some(2));

    let deleted = adapter
        .query("DELETE FROM t WHERE v = ?", vec![json!("z")])
        .await
        .expect("Delete should succeed");
    assert_eq!(deleted.rows_affected, Some(2));
    assert_eq!(count_rows(&adapter).await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn values_decode_by_storage_class() {
    let adapter = setup_adapter().await;

    let result = adapter
        .query(
            "SELECT 42 AS i, 1.5 AS r, 'txt' AS s, NULL AS n, x'0102' AS b",
            vec![],
        )
        .await
        .expect("Select should succeed");

    let row = &result.rows[0];
    assert_eq!(row["i"], json!(42));
    assert_eq!(row["r"], json!(1.5));
    assert_eq!(row["s"], json!("txt"));
    assert_eq!(row["n"], json!(null));
    assert_eq!(row["b"], json!("AQI="));
}

#[tokio::test(flavor = "multi_thread")]
async fn null_and_bool_params_bind() {
    let adapter = setup_adapter().await;

    adapter
        .query("INSERT INTO t (id, v) VALUES (?, ?)", vec![json!(7), json!(null)])
        .await
        .expect("Insert should succeed");

    let result = adapter
        .query("SELECT v IS NULL AS missing, ? AS flag FROM t", vec![json!(true)])
        .await
        .expect("Select should succeed");
    assert_eq!(result.rows[0]["missing"], json!(1));
    assert_eq!(result.rows[0]["flag"], json!(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_query_is_query_error_with_statement() {
    let adapter = setup_adapter().await;

    let err = adapter
        .query("SELECT * FROM missing_table", vec![])
        .await
        .expect_err("Query should fail");

    match err {
        DbError::Query { message, statement } => {
            assert!(message.contains("missing_table"), "message was {message}");
            assert_eq!(statement.as_deref(), Some("SELECT * FROM missing_table"));
        }
        other => panic!("Expected query error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn query_before_connect_fails_fast() {
    let adapter = SqliteAdapter::new(SqliteConfig::in_memory());

    let err = adapter
        .query("SELECT 1", vec![])
        .await
        .expect_err("Query should fail");
    assert!(matches!(err, DbError::Connection { .. }));

    let err = adapter
        .transaction(async |_tx| Ok(()))
        .await
        .expect_err("Transaction should fail");
    assert!(matches!(err, DbError::Connection { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_tracks_lifecycle() {
    let adapter = SqliteAdapter::new(SqliteConfig::in_memory());
    assert!(!adapter.health_check().await);

    adapter.connect().await.expect("Connect should succeed");
    assert!(adapter.health_check().await);

    adapter.disconnect().await.expect("Disconnect should succeed");
    assert!(!adapter.health_check().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_twice_is_a_no_op() {
    let adapter = setup_adapter().await;
    adapter
        .query("INSERT INTO t (v) VALUES ('kept')", vec![])
        .await
        .expect("Insert should succeed");

    adapter.connect().await.expect("Second connect should succeed");

    // Same in-memory database, so the row is still there.
    assert_eq!(count_rows(&adapter).await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn disconnect_is_idempotent() {
    let adapter = SqliteAdapter::new(SqliteConfig::in_memory());
    adapter.disconnect().await.expect("Disconnect without connect is fine");

    adapter.connect().await.expect("Connect should succeed");
    adapter.disconnect().await.expect("First disconnect should succeed");
    adapter.disconnect().await.expect("Second disconnect should succeed");
}

#[tokio::test(flavor = "multi_thread")]
async fn file_database_persists_across_reconnect() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("unidb.sqlite");
    let config = SqliteConfig {
        filename: path.to_string_lossy().into_owned(),
    };

    let adapter = SqliteAdapter::new(config.clone());
    adapter.connect().await.expect("Connect should succeed");
    adapter
        .query("CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)", vec![])
        .await
        .expect("Create should succeed");
    adapter
        .query("INSERT INTO t (v) VALUES (?)", vec![json!("durable")])
        .await
        .expect("Insert should succeed");
    adapter.disconnect().await.expect("Disconnect should succeed");

    let reopened = SqliteAdapter::new(config);
    reopened.connect().await.expect("Reconnect should succeed");
    let result = reopened
        .query("SELECT v FROM t", vec![])
        .await
        .expect("Select should succeed");
    assert_eq!(result.rows[0]["v"], json!("durable"));
}

#[tokio::test(flavor = "multi_thread")]
async fn transaction_commits_on_success() {
    let adapter = setup_adapter().await;

    let id = adapter
        .transaction(async |tx| {
            let done = tx
                .query("INSERT INTO t (v) VALUES (?)", vec![json!("in tx")])
                .await?;
            Ok(done.last_insert_id_i64())
        })
        .await
        .expect("Transaction should commit");

    assert_eq!(id, Some(1));
    assert_eq!(count_rows(&adapter).await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn transaction_rolls_back_and_returns_original_error() {
    let adapter = setup_adapter().await;

    let err = adapter
        .transaction(async |tx| {
            tx.query("INSERT INTO t (v) VALUES (?)", vec![json!("discarded")])
                .await?;
            Err::<(), _>(DbError::validation("body failed"))
        })
        .await
        .expect_err("Transaction should fail");

    assert!(
        matches!(&err, DbError::Validation { message } if message == "body failed"),
        "unexpected error: {err:?}"
    );
    assert_eq!(count_rows(&adapter).await, 0);

    // The adapter is still usable afterwards.
    adapter
        .query("INSERT INTO t (v) VALUES (?)", vec![json!("after")])
        .await
        .expect("Insert after rollback should succeed");
    assert_eq!(count_rows(&adapter).await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_statement_in_body_rolls_back() {
    let adapter = setup_adapter().await;

    let err = adapter
        .transaction(async |tx| {
            tx.query("INSERT INTO t (v) VALUES ('one')", vec![]).await?;
            tx.query("INSERT INTO nowhere VALUES (1)", vec![]).await?;
            Ok(())
        })
        .await
        .expect_err("Transaction should fail");

    assert_eq!(err.statement(), Some("INSERT INTO nowhere VALUES (1)"));
    assert_eq!(count_rows(&adapter).await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn nested_transaction_reuses_outer_context() {
    let adapter = setup_adapter().await;

    let err = adapter
        .transaction(async |tx| {
            tx.query("INSERT INTO t (v) VALUES ('outer')", vec![]).await?;
            tx.transaction(async |inner| {
                inner
                    .query("INSERT INTO t (v) VALUES ('inner')", vec![])
                    .await?;
                Ok(())
            })
            .await?;
            Err::<(), _>(DbError::validation("abort after nested"))
        })
        .await
        .expect_err("Outer transaction should fail");

    assert!(matches!(err, DbError::Validation { .. }));
    // No savepoint: the inner work goes with the outer rollback.
    assert_eq!(count_rows(&adapter).await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn transaction_context_health_check() {
    let adapter = setup_adapter().await;

    let healthy = adapter
        .transaction(async |tx| Ok(tx.health_check().await))
        .await
        .expect("Transaction should commit");
    assert!(healthy);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_transaction_is_rolled_back_before_next_use() {
    let adapter = setup_adapter().await;

    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        adapter.transaction(async |tx| {
            tx.query("INSERT INTO t (v) VALUES ('abandoned')", vec![])
                .await?;
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }),
    )
    .await;
    assert!(timed_out.is_err(), "Transaction should have timed out");

    // The abandoned insert is gone and the handle is out of BEGIN.
    assert_eq!(count_rows(&adapter).await, 0);
    adapter
        .transaction(async |tx| {
            tx.query("INSERT INTO t (v) VALUES ('next')", vec![]).await?;
            Ok(())
        })
        .await
        .expect("Next transaction should begin and commit");
    assert_eq!(count_rows(&adapter).await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn autocommit_after_cancelled_transaction_persists() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = SqliteConfig {
        filename: dir.path().join("unidb.sqlite").to_string_lossy().into_owned(),
    };

    let adapter = SqliteAdapter::new(config.clone());
    adapter.connect().await.expect("Connect should succeed");
    adapter
        .query("CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)", vec![])
        .await
        .expect("Create should succeed");

    let _ = tokio::time::timeout(
        Duration::from_millis(50),
        adapter.transaction(async |_tx| {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }),
    )
    .await;

    adapter
        .query("INSERT INTO t (v) VALUES ('plain')", vec![])
        .await
        .expect("Insert should succeed");
    adapter.disconnect().await.expect("Disconnect should succeed");

    let reopened = SqliteAdapter::new(config);
    reopened.connect().await.expect("Reconnect should succeed");
    assert_eq!(count_rows(&reopened).await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_begin_does_not_mark_handle() {
    let adapter = SqliteAdapter::new(SqliteConfig::in_memory());

    let err = adapter
        .transaction(async |_tx| Ok(()))
        .await
        .expect_err("Begin should fail before connect");
    assert!(matches!(err, DbError::Connection { .. }));

    adapter.connect().await.expect("Connect should succeed");
    adapter
        .transaction(async |tx| tx.query("SELECT 1 AS one", vec![]).await)
        .await
        .expect("Transaction should commit after connect");
}
