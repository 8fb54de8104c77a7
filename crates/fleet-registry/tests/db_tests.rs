use fleet_registry::InstanceDb;
use tempfile::TempDir;

fn seeded_db(dir: &TempDir, name: &str, schema: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let conn = rusqlite::Connection::open(&path).expect("open scratch db");
    conn.execute_batch(schema).expect("seed scratch db");
    path
}

#[test]
fn table_count_on_empty_database_is_zero() {
    let db = InstanceDb::open_in_memory().unwrap();
    assert_eq!(db.table_count().unwrap(), 0);
}

#[test]
fn table_count_reflects_provisioned_schema() {
    let dir = TempDir::new().unwrap();
    let path = seeded_db(
        &dir,
        "acme.db",
        "CREATE TABLE system_config (name TEXT PRIMARY KEY, value TEXT);
         CREATE TABLE system_resource (name TEXT PRIMARY KEY);
         CREATE TABLE contact (id INTEGER PRIMARY KEY, email TEXT);",
    );

    let db = InstanceDb::open(&path).unwrap();
    assert_eq!(db.table_count().unwrap(), 3);
}

#[test]
fn clear_legacy_setting_removes_only_the_legacy_row() {
    let dir = TempDir::new().unwrap();
    let path = seeded_db(
        &dir,
        "acme.db",
        "CREATE TABLE system_resource (name TEXT PRIMARY KEY);
         INSERT INTO system_resource (name) VALUES ('setting'), ('admin'), ('environment');",
    );

    let db = InstanceDb::open(&path).unwrap();
    assert_eq!(db.clear_legacy_setting().unwrap(), 1);
    // A second pass finds nothing left to remove.
    assert_eq!(db.clear_legacy_setting().unwrap(), 0);
    drop(db);

    let conn = rusqlite::Connection::open(&path).unwrap();
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM system_resource", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 2);
}

#[test]
fn clear_legacy_setting_fails_without_the_table() {
    let db = InstanceDb::open_in_memory().unwrap();
    assert!(db.clear_legacy_setting().is_err());
}

#[test]
fn open_fails_for_unreachable_path() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("no-such-dir").join("acme.db");
    assert!(InstanceDb::open(&missing).is_err());
}
