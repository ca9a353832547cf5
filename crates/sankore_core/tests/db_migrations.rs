use rusqlite::Connection;
use sankore_core::db::migrations::{latest_version, migrate_to};
use sankore_core::db::{open_db, open_db_in_memory, DbError};
use sankore_core::{LibraryRepository, SqliteLibraryRepository, TO_READ};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "libraries");
    assert_table_exists(&conn, "books");
    assert_table_exists(&conn, "quotes");
    assert_table_exists(&conn, "ongoing_reads");
    assert_table_exists(&conn, "finished_reads");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("sankore.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "books");
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
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn upgrading_first_schema_keeps_catalogued_books() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.sqlite3");

    let mut conn = Connection::open(&path).unwrap();
    migrate_to(&mut conn, 1).unwrap();
    assert_eq!(schema_version(&conn), 1);
    assert_table_missing(&conn, "ongoing_reads");
    conn.execute_batch(
        "INSERT INTO libraries (name, description, tracks_progress, rateable, position)
         VALUES ('To Read', 'Books waiting on the shelf.', 0, 0, 0);
         INSERT INTO books (uuid, title, author, pages, rating, library_name, position)
         VALUES ('6f1c2b4e-8f0a-4c39-9a53-0d2f7b1e5a10', 'The Aeneid', 'Virgil', 442, 0, 'To Read', 0);
         INSERT INTO quotes (book_uuid, content, position)
         VALUES ('6f1c2b4e-8f0a-4c39-9a53-0d2f7b1e5a10', 'Fortune favors the bold.', 0);",
    )
    .unwrap();
    drop(conn);

    let mut conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "finished_reads");

    let repo = SqliteLibraryRepository::try_new(&mut conn).unwrap();
    let store = repo.load().unwrap();
    let book = store.find_book("The Aeneid").unwrap();
    assert_eq!(store.find_library(book), Some(TO_READ));
    assert_eq!(book.quotes, vec!["Fortune favors the bold.".to_string()]);
    assert!(book.reads.is_empty());
    assert_eq!(book.current_page(), 0);
}

#[test]
fn unusable_parent_directory_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let err = open_db(blocker.join("nested").join("sankore.sqlite3")).unwrap_err();
    match err {
        DbError::CreateDir { dir, .. } => assert_eq!(dir, blocker.join("nested")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let err = conn.execute(
        "INSERT INTO books (uuid, title, author, pages, rating, library_name, position)
         VALUES ('x', 'Orphan', 'Nobody', 10, 0, 'Missing Library', 0);",
        [],
    );
    assert!(err.is_err());
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

fn assert_table_missing(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 0, "table {table_name} should not exist yet");
}
