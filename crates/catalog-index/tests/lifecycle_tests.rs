use catalog_index::{CatalogConfig, Error, Index, IndexDriver, index_driver_init};
use serde_json::json;
use tempfile::TempDir;

fn memory_config() -> CatalogConfig {
   CatalogConfig {
      path: ":memory:".into(),
      ..Default::default()
   }
}

fn file_config(dir: &TempDir, file: &str) -> CatalogConfig {
   CatalogConfig {
      path: dir.path().join(file),
      ..Default::default()
   }
}

#[tokio::test]
async fn test_from_config_validates_eagerly() {
   let dir = TempDir::new().unwrap();
   let config = CatalogConfig {
      path: dir.path().join("no-such-dir").join("catalog.db"),
      ..Default::default()
   };

   // A handle with a known-bad connection is never returned
   let result = Index::from_config(&config, None, true).await;
   assert!(matches!(result, Err(Error::Connection(_))));
}

#[tokio::test]
async fn test_init_db_seeds_defaults_exactly_once() {
   let index = Index::from_config(&memory_config(), None, true).await.unwrap();

   assert!(index.init_db(true, true).await.unwrap());

   let seeded = index.metadata_types.list().await.unwrap();
   let names: Vec<_> = seeded.iter().map(|mt| mt.name.as_str()).collect();
   assert_eq!(names, ["eo", "telemetry"]);

   // Second call: not newly created, and no reseeding
   assert!(!index.init_db(true, true).await.unwrap());
   assert_eq!(index.metadata_types.list().await.unwrap(), seeded);
}

#[tokio::test]
async fn test_init_db_without_defaults_leaves_registry_empty() {
   let index = Index::from_config(&memory_config(), None, true).await.unwrap();

   assert!(index.init_db(false, true).await.unwrap());
   assert!(index.metadata_types.list().await.unwrap().is_empty());

   // Defaults don't appear later either: initialization is one-time-on-creation
   assert!(!index.init_db(true, true).await.unwrap());
   assert!(index.metadata_types.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_close_is_idempotent_and_not_terminal() {
   let dir = TempDir::new().unwrap();
   let index = Index::from_config(&file_config(&dir, "close.db"), None, true)
      .await
      .unwrap();

   index.init_db(true, true).await.unwrap();

   index.close().await.unwrap();
   index.close().await.unwrap();

   // Still usable: the next operation re-acquires transparently
   assert_eq!(index.metadata_types.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_url_is_stable_across_close() {
   let dir = TempDir::new().unwrap();
   let index = Index::from_config(&file_config(&dir, "url.db"), None, true)
      .await
      .unwrap();

   let url = index.url();
   assert!(!url.is_empty());

   index.close().await.unwrap();
   assert_eq!(index.url(), url);

   assert_eq!(format!("{index:?}"), format!("Index<db={url}>"));
}

#[tokio::test]
async fn test_scoped_releases_connections_on_success() {
   let dir = TempDir::new().unwrap();
   let path = dir.path().join("scoped_ok.db");
   let config = CatalogConfig {
      path: path.clone(),
      ..Default::default()
   };

   let index = Index::from_config(&config, None, true).await.unwrap();

   let count = index
      .scoped(|index| async move {
         index.init_db(true, true).await?;
         index.metadata_types.list().await.map(|types| types.len())
      })
      .await
      .unwrap();

   assert_eq!(count, 2);

   // close() checkpoints the WAL; a non-empty WAL here would mean the scope
   // exited without releasing the connection
   let wal_path = path.with_extension("db-wal");
   if wal_path.exists() {
      assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), 0);
   }
}

#[tokio::test]
async fn test_scoped_releases_connections_on_error() {
   let dir = TempDir::new().unwrap();
   let path = dir.path().join("scoped_err.db");
   let config = CatalogConfig {
      path: path.clone(),
      ..Default::default()
   };

   let index = Index::from_config(&config, None, true).await.unwrap();

   // Fault injection: write something, then fail out of the scope
   let result: Result<(), Error> = index
      .scoped(|index| async move {
         index.init_db(true, true).await?;
         Err(Error::InvalidDocument("injected failure".into()))
      })
      .await;

   assert!(matches!(result, Err(Error::InvalidDocument(_))));

   let wal_path = path.with_extension("db-wal");
   if wal_path.exists() {
      assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), 0);
   }
}

#[tokio::test]
async fn test_registries_share_one_connection_handle() {
   let index = Index::from_config(&memory_config(), None, true).await.unwrap();
   index.init_db(false, true).await.unwrap();

   // A type added through the facade's metadata-type registry is visible to
   // the product registry's dependency lookup - one store, one handle
   let doc = json!({"name": "minimal", "dataset": {"id": ["id"]}});
   let record = index.metadata_types.from_doc(&doc).unwrap();
   index.metadata_types.add(&record, false).await.unwrap();

   let product = index
      .products
      .from_doc(&json!({"name": "p1", "metadata_type": "minimal"}))
      .unwrap();
   let stored = index.products.add(&product).await.unwrap();
   assert_eq!(stored.metadata_type, "minimal");

   // Dependency chain is reachable from the dependents
   assert!(
      index
         .datasets
         .products()
         .metadata_types()
         .get_by_name("minimal")
         .await
         .unwrap()
         .is_some()
   );
}

#[tokio::test]
async fn test_default_driver_delegates_to_from_config() {
   let driver = index_driver_init();
   let index = driver
      .connect_to_index(&memory_config(), Some("driver-test"), true)
      .await
      .unwrap();

   assert!(index.init_db(true, true).await.unwrap());
   assert_eq!(index.db().application_name(), Some("driver-test"));
}
