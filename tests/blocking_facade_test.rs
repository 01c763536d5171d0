use db_facade::config::PoolOptions;
use db_facade::db::{AuditLogger, BlockingFacade, MemorySink};
use db_facade::models::ConnectionConfig;
use db_facade::{DbError, params};
use serde_json::json;
use std::sync::Arc;

fn connect(dir: &tempfile::TempDir) -> (BlockingFacade, Arc<MemorySink>) {
    let url = format!("sqlite://{}", dir.path().join("blocking.db").display());
    let config = ConnectionConfig::new(url, PoolOptions::default()).unwrap();
    let sink = Arc::new(MemorySink::new());
    let facade = BlockingFacade::connect(&config, AuditLogger::new(sink.clone())).unwrap();
    facade
        .execute(
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, age INTEGER)",
            &params! {},
        )
        .unwrap();
    (facade, sink)
}

#[test]
fn test_blocking_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (facade, sink) = connect(&dir);

    let id = facade
        .insert_id(
            "INSERT INTO users (name, age) VALUES (:name, :age)",
            &params! { "name" => "test3333", "age" => 16 },
        )
        .unwrap();

    let name = facade
        .get_var("SELECT name FROM users WHERE id = :id", &params! { "id" => id })
        .unwrap();
    assert_eq!(name, Some(json!("test3333")));

    let updated = facade
        .execute(
            "UPDATE users SET name = :name WHERE id = :id",
            &params! { "id" => id, "name" => "test" },
        )
        .unwrap();
    assert_eq!(updated, 1);

    let rows = facade
        .query("SELECT * FROM users WHERE id = :id", &params! { "id" => id })
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("test"));

    // CREATE TABLE, insert_id, get_var, execute, query
    assert_eq!(sink.entries().len(), 5);
    facade.close().unwrap();
}

#[test]
fn test_blocking_errors_propagate() {
    let dir = tempfile::tempdir().unwrap();
    let (facade, _sink) = connect(&dir);

    let err = facade
        .get_row("SELECT * FROM nowhere", &params! {})
        .unwrap_err();
    assert!(matches!(err, DbError::Statement { .. }));
    assert!(matches!(
        facade.page_and_size(1, 0),
        Err(DbError::Validation { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_blocking_facade_inside_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let (facade, _sink) = connect(&dir);

    let count = facade
        .executemany(
            "INSERT INTO users (name, age) VALUES (:name, :age)",
            &[
                params! { "name" => "a", "age" => 1 },
                params! { "name" => "b", "age" => 2 },
            ],
        )
        .unwrap();
    assert_eq!(count, 2);
    drop(facade);
}
