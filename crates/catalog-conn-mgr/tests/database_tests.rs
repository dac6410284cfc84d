use catalog_conn_mgr::{CatalogConfig, CatalogDb, Error};
use std::sync::Arc;
use tempfile::TempDir;

fn config_for(dir: &TempDir, file: &str) -> CatalogConfig {
   CatalogConfig {
      path: dir.path().join(file),
      ..Default::default()
   }
}

#[tokio::test]
async fn test_validate_connection_fails_on_unopenable_path() {
   let dir = TempDir::new().unwrap();
   let config = CatalogConfig {
      // Parent directory doesn't exist, so the file cannot be created
      path: dir.path().join("missing-subdir").join("catalog.db"),
      ..Default::default()
   };

   let result = CatalogDb::from_config(&config, None, true).await;
   assert!(matches!(result, Err(Error::Sqlx(_))));
}

#[tokio::test]
async fn test_deferred_validation_fails_on_first_use() {
   let dir = TempDir::new().unwrap();
   let config = CatalogConfig {
      path: dir.path().join("missing-subdir").join("catalog.db"),
      ..Default::default()
   };

   // Construction succeeds because nothing is opened yet
   let db = CatalogDb::from_config(&config, None, false).await.unwrap();

   // First acquisition surfaces the failure
   assert!(db.read_pool().await.is_err());
}

#[tokio::test]
async fn test_init_reports_first_time_creation_once() {
   let dir = TempDir::new().unwrap();
   let db = CatalogDb::from_config(&config_for(&dir, "init.db"), None, true)
      .await
      .unwrap();

   assert!(db.init(true).await.unwrap(), "first init should create");
   assert!(!db.init(true).await.unwrap(), "second init should not");
   assert!(!db.init(false).await.unwrap());
}

#[tokio::test]
async fn test_close_is_idempotent() {
   let dir = TempDir::new().unwrap();
   let db = CatalogDb::from_config(&config_for(&dir, "close.db"), None, true)
      .await
      .unwrap();

   db.close().await.unwrap();
   db.close().await.unwrap();
   db.close().await.unwrap();
}

#[tokio::test]
async fn test_reacquires_transparently_after_close() {
   let dir = TempDir::new().unwrap();
   let db = CatalogDb::from_config(&config_for(&dir, "reopen.db"), None, true)
      .await
      .unwrap();

   db.init(false).await.unwrap();

   let mut writer = db.acquire_writer().await.unwrap();
   sqlx::query("INSERT INTO metadata_type (name, definition, added) VALUES (?, ?, ?)")
      .bind("eo")
      .bind("{}")
      .bind("2026-01-01T00:00:00Z")
      .execute(&mut *writer)
      .await
      .unwrap();
   drop(writer);

   db.close().await.unwrap();

   // Reads work again without any explicit reopen, and see the data
   let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metadata_type")
      .fetch_one(&db.read_pool().await.unwrap())
      .await
      .unwrap();
   assert_eq!(count, 1);
}

#[tokio::test]
async fn test_url_stable_across_close() {
   let dir = TempDir::new().unwrap();
   let db = CatalogDb::from_config(&config_for(&dir, "url.db"), None, true)
      .await
      .unwrap();

   let url = db.url();
   assert!(!url.is_empty());
   assert!(url.starts_with("sqlite:"));

   db.close().await.unwrap();
   assert_eq!(db.url(), url);
}

#[tokio::test]
async fn test_wal_checkpoint_on_close() {
   let dir = TempDir::new().unwrap();
   let path = dir.path().join("wal.db");
   let config = CatalogConfig {
      path: path.clone(),
      ..Default::default()
   };

   let db = CatalogDb::from_config(&config, None, true).await.unwrap();
   db.init(false).await.unwrap();

   let mut writer = db.acquire_writer().await.unwrap();
   sqlx::query("INSERT INTO metadata_type (name, definition, added) VALUES (?, ?, ?)")
      .bind("telemetry")
      .bind("{}")
      .bind("2026-01-01T00:00:00Z")
      .execute(&mut *writer)
      .await
      .unwrap();
   drop(writer);

   db.close().await.unwrap();

   // WAL file should be either absent or truncated after checkpoint
   let wal_path = path.with_extension("db-wal");
   if wal_path.exists() {
      let wal_size = std::fs::metadata(&wal_path).unwrap().len();
      assert_eq!(wal_size, 0, "WAL file should be 0 bytes after checkpoint");
   }
}

#[tokio::test]
async fn test_write_serialization() {
   use std::time::{Duration, Instant};

   let dir = TempDir::new().unwrap();
   let db = CatalogDb::from_config(&config_for(&dir, "serial.db"), None, true)
      .await
      .unwrap();

   let mut writer = db.acquire_writer().await.unwrap();
   sqlx::query("CREATE TABLE counter (id INTEGER PRIMARY KEY, value INTEGER)")
      .execute(&mut *writer)
      .await
      .unwrap();
   sqlx::query("INSERT INTO counter (id, value) VALUES (1, 0)")
      .execute(&mut *writer)
      .await
      .unwrap();
   drop(writer);

   // Spawn 3 concurrent write tasks (proves single-connection write pool serializes)
   let start = Instant::now();
   let mut handles = vec![];

   for _ in 0..3 {
      let db = Arc::clone(&db);
      handles.push(tokio::spawn(async move {
         let mut writer = db.acquire_writer().await.unwrap();
         tokio::time::sleep(Duration::from_millis(10)).await;
         sqlx::query("UPDATE counter SET value = value + 1 WHERE id = 1")
            .execute(&mut *writer)
            .await
            .unwrap();
      }));
   }

   for handle in handles {
      handle.await.unwrap();
   }

   let (value,): (i64,) = sqlx::query_as("SELECT value FROM counter WHERE id = 1")
      .fetch_one(&db.read_pool().await.unwrap())
      .await
      .unwrap();

   assert_eq!(value, 3, "all 3 writes should have been applied");

   // Should take at least 30ms (3 tasks x 10ms) proving writes are serialized
   assert!(
      start.elapsed().as_millis() >= 25,
      "Serialized writes took {}ms (expected >=25ms, would be ~10ms if concurrent)",
      start.elapsed().as_millis()
   );
}
