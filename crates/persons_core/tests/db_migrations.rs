use persons_core::db::migrations::latest_version;
use persons_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "cities");
    assert_table_exists(&conn, "persons");
    assert_table_exists(&conn, "phone_numbers");
    assert_table_exists(&conn, "relationships");
}

#[test]
fn seed_rows_are_present() {
    let conn = open_db_in_memory().unwrap();

    for (table, expected) in [
        ("cities", 4),
        ("persons", 4),
        ("phone_numbers", 4),
        ("relationships", 4),
    ] {
        let rows: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, expected, "unexpected row count in {table}");
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persons.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let persons: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM persons", [], |row| row.get(0))
        .unwrap();
    assert_eq!(persons, 4);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();

    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = conn
        .execute(
            "INSERT INTO phone_numbers (number_type, number, person_id, created_at, updated_at)
             VALUES ('mobile', '5550000', 999, 0, 0)",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}

#[test]
fn personal_number_is_unique() {
    let conn = open_db_in_memory().unwrap();

    let err = conn
        .execute(
            "INSERT INTO persons (name, surname, gender, personal_number, date_of_birth, city_id, created_at, updated_at)
             VALUES ('Alex', 'Clone', 'male', '12345678901', '1990-01-01', 1, 0, 0)",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("UNIQUE"));
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
