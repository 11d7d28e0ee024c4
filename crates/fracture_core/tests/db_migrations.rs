use fracture_core::db::migrations::latest_version;
use fracture_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in ["elements", "tags", "map_tags", "settings", "map_dependencies"] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn fresh_schema_holds_exactly_one_empty_settings_row() {
    let conn = open_db_in_memory().unwrap();

    let mut stmt = conn.prepare("SELECT data FROM settings;").unwrap();
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(rows, vec!["{}".to_string()]);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.fracture");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let settings_rows: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM settings;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(settings_rows, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.fracture");

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
fn schema_enforces_unique_keys_and_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO elements (identifier) VALUES ('a');", [])
        .unwrap();

    let duplicate = conn.execute("INSERT INTO elements (identifier) VALUES ('a');", []);
    assert!(duplicate.is_err());

    conn.execute("INSERT INTO tags (tag) VALUES ('x');", []).unwrap();
    assert!(conn.execute("INSERT INTO tags (tag) VALUES ('x');", []).is_err());

    let dangling = conn.execute(
        "INSERT INTO map_tags (element_id, tag_id) VALUES (999, 999);",
        [],
    );
    assert!(dangling.is_err());
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
