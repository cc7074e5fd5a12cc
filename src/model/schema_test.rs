use serde_json::json;

use crate::db::{DbError, Row};
use crate::model::{ColumnDef, ColumnType, EntitySchema, validate_model_schema};

static COLUMNS: [ColumnDef; 3] = [
    ColumnDef::new("id").kind(ColumnType::Integer),
    ColumnDef::new("displayName").column("display_name"),
    ColumnDef::new("flags").kind(ColumnType::Json),
];

static SCHEMA: EntitySchema = EntitySchema {
    table: "accounts",
    columns: &COLUMNS,
};

fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("Expected object"),
    }
}

#[test]
fn valid_schema_passes() {
    assert!(validate_model_schema(&SCHEMA).is_ok());
}

#[test]
fn missing_table_or_columns_fail() {
    let no_table = EntitySchema {
        table: " ",
        columns: &COLUMNS,
    };
    assert!(matches!(
        validate_model_schema(&no_table),
        Err(DbError::Validation { .. })
    ));

    let no_columns = EntitySchema {
        table: "accounts",
        columns: &[],
    };
    assert!(matches!(
        validate_model_schema(&no_columns),
        Err(DbError::Validation { .. })
    ));
}

#[test]
fn unnamed_column_fails() {
    static BAD: [ColumnDef; 1] = [ColumnDef::new("name").column("")];
    let schema = EntitySchema {
        table: "t",
        columns: &BAD,
    };
    assert!(validate_model_schema(&schema).is_err());
}

#[test]
fn rows_are_rekeyed_and_decoded() {
    let fields = SCHEMA.row_to_fields(&row(json!({
        "id": 3,
        "display_name": "Ada",
        "flags": "{\"admin\":true}",
        "unmapped": 1
    })));

    assert_eq!(
        serde_json::Value::Object(fields),
        json!({"id": 3, "displayName": "Ada", "flags": {"admin": true}})
    );
}

#[test]
fn column_values_skip_id_and_fill_nulls() {
    let values = SCHEMA.column_values(&row(json!({"id": 9, "displayName": "Ada"})));
    assert_eq!(
        values,
        vec![("display_name", json!("Ada")), ("flags", serde_json::Value::Null)]
    );
}

#[test]
fn boolean_columns_decode_integers() {
    static FLAG: [ColumnDef; 1] = [ColumnDef::new("active").kind(ColumnType::Boolean)];
    let schema = EntitySchema {
        table: "t",
        columns: &FLAG,
    };
    let fields = schema.row_to_fields(&row(json!({"active": 0})));
    assert_eq!(fields.get("active"), Some(&json!(false)));
    let fields = schema.row_to_fields(&row(json!({"active": 1})));
    assert_eq!(fields.get("active"), Some(&json!(true)));
}
