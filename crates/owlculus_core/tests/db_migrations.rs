use owlculus_core::db::migrations::latest_version;
use owlculus_core::db::{open_db, open_db_in_memory, DbError, Schema};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let cases = open_db_in_memory(Schema::Cases).unwrap();
    assert_eq!(schema_version(&cases), latest_version(Schema::Cases));
    assert_table_exists(&cases, "cases");
    assert_column_exists(&cases, "cases", "folder_name");

    let clients = open_db_in_memory(Schema::Clients).unwrap();
    assert_eq!(schema_version(&clients), latest_version(Schema::Clients));
    assert_table_exists(&clients, "clients");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cases.db");

    let conn_first = open_db(&path, Schema::Cases).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version(Schema::Cases));
    drop(conn_first);

    let conn_second = open_db(&path, Schema::Cases).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version(Schema::Cases));
    assert_table_exists(&conn_second, "cases");
}

#[test]
fn folder_name_migration_backfills_existing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cases.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/cases/0001_init.sql"))
        .unwrap();
    conn.execute(
        "INSERT INTO cases (case_number, case_type, client_name, created_at)
         VALUES ('2401-01', 'Person', NULL, '2024-01-05 10:00:00');",
        [],
    )
    .unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();
    drop(conn);

    let conn = open_db(&path, Schema::Cases).unwrap();
    let folder: String = conn
        .query_row(
            "SELECT folder_name FROM cases WHERE case_number = '2401-01';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(folder, "2401-01");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, Schema::Clients).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            schema,
            db_version,
            latest_supported,
        } => {
            assert_eq!(schema, Schema::Clients);
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version(Schema::Clients));
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

fn assert_column_exists(conn: &Connection, table_name: &str, column: &str) {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table_name});"))
        .unwrap();
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>("name"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(columns.iter().any(|name| name == column), "missing column {column}");
}
