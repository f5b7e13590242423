use contentrepo_core::db::migrations::latest_version;
use contentrepo_core::db::{ensure_schema_ready, open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "content_nodes");
    assert_table_exists(&conn, "article_versions");
    ensure_schema_ready(&conn).unwrap();
}

#[test]
fn migrations_seed_the_root_folder() {
    let conn = open_db_in_memory().unwrap();

    let (node_type, parent_path): (String, Option<String>) = conn
        .query_row(
            "SELECT node_type, parent_path FROM content_nodes WHERE path = '/';",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(node_type, "folder");
    assert_eq!(parent_path, None);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("content.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let roots: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM content_nodes WHERE path = '/';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(roots, 1);
}

#[test]
fn file_database_uses_wal_journal() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("content.db")).unwrap();

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode, "wal");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

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
fn unmigrated_connection_is_not_ready() {
    let conn = Connection::open_in_memory().unwrap();

    let err = ensure_schema_ready(&conn).unwrap_err();
    assert!(matches!(
        err,
        DbError::SchemaNotReady {
            expected_version,
            actual_version: 0,
        } if expected_version == latest_version()
    ));
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
