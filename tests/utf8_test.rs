//! UTF-8 values through bound parameters and the audit rendering.

use db_facade::config::PoolOptions;
use db_facade::db::{AsyncFacade, AuditLogger, MemorySink};
use db_facade::models::ConnectionConfig;
use db_facade::params;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_sqlite_utf8_chinese_characters() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("utf8.db").display());
    let config = ConnectionConfig::new(url, PoolOptions::default()).unwrap();
    let sink = Arc::new(MemorySink::new());
    let facade = AsyncFacade::connect(&config, AuditLogger::new(sink.clone()))
        .await
        .unwrap();

    facade
        .execute(
            "CREATE TABLE utf8_test (id INTEGER PRIMARY KEY, name TEXT, description TEXT)",
            &params! {},
        )
        .await
        .unwrap();
    facade
        .execute(
            "INSERT INTO utf8_test (id, name, description) VALUES (:id, :name, :description)",
            &params! { "id" => 1, "name" => "张三", "description" => "这是中文描述" },
        )
        .await
        .unwrap();

    let row = facade
        .get_row("SELECT * FROM utf8_test WHERE name = :name", &params! { "name" => "张三" })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row["name"], json!("张三"));
    assert_eq!(row["description"], json!("这是中文描述"));

    let rendered: Vec<String> = sink.entries().into_iter().map(|e| e.rendered).collect();
    assert!(rendered.iter().any(|r| r.contains("'这是中文描述'")));
}

/// Requires `TEST_MYSQL_URL`; the pool sets the connection charset to utf8mb4.
#[tokio::test]
async fn test_mysql_utf8_chinese_characters() {
    let mysql_url = match std::env::var("TEST_MYSQL_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: TEST_MYSQL_URL not set");
            return;
        }
    };

    let config = ConnectionConfig::new(mysql_url, PoolOptions::default()).unwrap();
    let facade = AsyncFacade::connect(&config, AuditLogger::default())
        .await
        .unwrap();

    facade
        .execute("DROP TABLE IF EXISTS utf8_test", &params! {})
        .await
        .unwrap();
    facade
        .execute(
            r#"CREATE TABLE utf8_test (
                id INT PRIMARY KEY COMMENT '主键ID',
                name VARCHAR(100) COMMENT '用户名称',
                description TEXT COMMENT '详细描述'
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COMMENT='中文测试表'"#,
            &params! {},
        )
        .await
        .unwrap();
    facade
        .execute(
            "INSERT INTO utf8_test (id, name, description) VALUES (:id, :name, :description)",
            &params! { "id" => 1, "name" => "张三", "description" => "这是中文描述" },
        )
        .await
        .unwrap();

    let name = facade
        .get_var("SELECT name FROM utf8_test WHERE id = :id", &params! { "id" => 1 })
        .await
        .unwrap();
    assert_eq!(name, Some(json!("张三")));

    facade
        .execute("DROP TABLE utf8_test", &params! {})
        .await
        .unwrap();
    facade.close().await.unwrap();
}
