//! Catalog database handle with reopenable connection pooling

use crate::Result;
use crate::config::CatalogConfig;
use crate::error::Error;
use crate::write_guard::WriteGuard;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, Pool, Sqlite};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Statements creating the catalog tables. All idempotent.
const CATALOG_SCHEMA: &[&str] = &[
   "CREATE TABLE IF NOT EXISTS metadata_type (
       id         INTEGER PRIMARY KEY,
       name       TEXT UNIQUE NOT NULL,
       definition TEXT NOT NULL,
       added      TEXT NOT NULL
    )",
   "CREATE TABLE IF NOT EXISTS product (
       id                INTEGER PRIMARY KEY,
       name              TEXT UNIQUE NOT NULL,
       metadata_type_ref INTEGER NOT NULL REFERENCES metadata_type (id),
       definition        TEXT NOT NULL,
       added             TEXT NOT NULL
    )",
   "CREATE TABLE IF NOT EXISTS dataset (
       id          TEXT PRIMARY KEY,
       product_ref INTEGER NOT NULL REFERENCES product (id),
       metadata    TEXT NOT NULL,
       added       TEXT NOT NULL,
       archived    TEXT
    )",
   "CREATE INDEX IF NOT EXISTS ix_dataset_product ON dataset (product_ref)",
];

/// Statements creating the access-control tables, applied when
/// `init(with_permissions = true)`.
const PERMISSION_SCHEMA: &[&str] = &[
   "CREATE TABLE IF NOT EXISTS role (
       name        TEXT PRIMARY KEY,
       description TEXT NOT NULL
    )",
   "CREATE TABLE IF NOT EXISTS user_account (
       username    TEXT PRIMARY KEY,
       role        TEXT NOT NULL REFERENCES role (name),
       description TEXT
    )",
];

/// Built-in access roles, seeded alongside the permission tables.
const ACCESS_ROLES: &[(&str, &str)] = &[
   ("user", "Read access to the catalog"),
   ("ingest", "Read access plus dataset indexing"),
   ("manage", "Read/write access to products and datasets"),
   ("admin", "Full access including user management"),
];

/// The catalog's single connection handle.
///
/// Wraps a read-only pool for concurrent reads and a single-connection write
/// pool for serialized writes, the pair living behind a lock so that
/// [`close`](CatalogDb::close) can tear them down without invalidating the
/// handle: the next acquisition transparently reopens them.
///
/// A `CatalogDb` (behind its `Arc`) may be shared freely between tasks and
/// threads within one process. It must **not** be shared across a process
/// fork once pools have been opened - SQLite connections are not fork-safe.
/// Call `close()` before forking, or construct a separate handle per process.
///
/// # Example
///
/// ```no_run
/// use catalog_conn_mgr::{CatalogConfig, CatalogDb};
///
/// # async fn example() -> Result<(), catalog_conn_mgr::Error> {
/// let config = CatalogConfig { path: "catalog.db".into(), ..Default::default() };
/// let db = CatalogDb::from_config(&config, Some("demo"), true).await?;
///
/// let rows = sqlx::query("SELECT name FROM metadata_type")
///     .fetch_all(&db.read_pool().await?)
///     .await?;
///
/// db.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CatalogDb {
   /// Path to the database file (`:memory:` for in-memory databases)
   path: PathBuf,

   /// Identifying label for diagnostics; attached to lifecycle log output
   application_name: Option<String>,

   /// Pool sizing and timeout settings
   config: CatalogConfig,

   /// Current pools, `None` while the handle is idle (before first use or
   /// after `close()`)
   pools: RwLock<Option<PoolSet>>,

   /// Tracks if WAL mode has been initialized (set on first write; the
   /// pragma itself persists in the database file across reopens)
   wal_initialized: AtomicBool,
}

#[derive(Debug, Clone)]
struct PoolSet {
   /// Pool of read-only connections for concurrent reads
   read_pool: Pool<Sqlite>,

   /// Single read-write connection pool (max_connections=1) for serialized writes
   write_conn: Pool<Sqlite>,
}

fn is_memory_database(path: &Path) -> bool {
   path.as_os_str() == ":memory:"
}

impl CatalogDb {
   /// Construct a connection handle from configuration.
   ///
   /// An explicit `application_name` overrides the one in `config`. When
   /// `validate_connection` is true the pools are opened eagerly and a probe
   /// query is run, so a handle whose connection is known-bad is never
   /// returned; when false, opening is deferred to the first acquisition.
   ///
   /// This layer adds no retry logic - connectivity failures surface to the
   /// caller unchanged.
   pub async fn from_config(
      config: &CatalogConfig,
      application_name: Option<&str>,
      validate_connection: bool,
   ) -> Result<Arc<Self>> {
      if config.path.as_os_str().is_empty() {
         return Err(Error::EmptyPath);
      }

      let db = Arc::new(Self {
         path: config.path.clone(),
         application_name: application_name
            .map(str::to_owned)
            .or_else(|| config.application_name.clone()),
         config: config.clone(),
         pools: RwLock::new(None),
         wal_initialized: AtomicBool::new(false),
      });

      if validate_connection {
         let pools = db.pools().await?;
         sqlx::query("SELECT 1").fetch_one(&pools.read_pool).await?;
         debug!(
            url = %db.url(),
            application_name = db.application_name.as_deref().unwrap_or("-"),
            "catalog connection validated"
         );
      }

      Ok(db)
   }

   /// Get the connection pool for executing read queries.
   ///
   /// Multiple readers can use the pool simultaneously. Reopens the pools if
   /// the handle was closed.
   pub async fn read_pool(&self) -> Result<Pool<Sqlite>> {
      Ok(self.pools().await?.read_pool)
   }

   /// Acquire exclusive write access to the catalog.
   ///
   /// Returns a [`WriteGuard`] over the single write connection; only one
   /// writer exists at a time, so writes are serialized within the process.
   /// On the first call this enables WAL mode (file databases only).
   /// Reopens the pools if the handle was closed.
   pub async fn acquire_writer(&self) -> Result<WriteGuard> {
      let pools = self.pools().await?;
      let mut conn = pools.write_conn.acquire().await?;

      // Initialize WAL mode on first use (idempotent and safe). In-memory
      // databases don't support WAL and keep the default journal mode.
      if !is_memory_database(&self.path) && !self.wal_initialized.load(Ordering::SeqCst) {
         sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&mut *conn)
            .await?;

         // https://www.sqlite.org/wal.html#performance_considerations
         sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&mut *conn)
            .await?;

         self.wal_initialized.store(true, Ordering::SeqCst);
      }

      Ok(WriteGuard::new(conn))
   }

   /// Initialize the catalog schema if it does not exist yet.
   ///
   /// Returns `true` iff this call performed the first-time creation. Safe
   /// to call repeatedly; every statement is idempotent. When
   /// `with_permissions` is set, the access-control tables are created as
   /// well and the built-in roles are seeded.
   pub async fn init(&self, with_permissions: bool) -> Result<bool> {
      let mut writer = self.acquire_writer().await?;

      let (existing,): (i64,) = sqlx::query_as(
         "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'metadata_type'",
      )
      .fetch_one(&mut *writer)
      .await?;

      let is_new = existing == 0;

      for statement in CATALOG_SCHEMA {
         sqlx::query(statement).execute(&mut *writer).await?;
      }

      if with_permissions {
         for statement in PERMISSION_SCHEMA {
            sqlx::query(statement).execute(&mut *writer).await?;
         }

         for (name, description) in ACCESS_ROLES {
            sqlx::query("INSERT OR IGNORE INTO role (name, description) VALUES (?, ?)")
               .bind(name)
               .bind(description)
               .execute(&mut *writer)
               .await?;
         }
      }

      if is_new {
         debug!(url = %self.url(), "created catalog schema");
      }

      Ok(is_new)
   }

   /// Release idle database connections.
   ///
   /// Good practice when the handle stays in scope but won't be used for a
   /// while, and required before forking the process. The handle remains
   /// usable: a subsequent operation transparently reopens the pools.
   /// Idempotent - closing an already-idle handle is a no-op.
   ///
   /// In-memory databases keep their sole connection open, since it is also
   /// their storage.
   pub async fn close(&self) -> Result<()> {
      if is_memory_database(&self.path) {
         debug!("close() is a no-op for in-memory databases");
         return Ok(());
      }

      let mut guard = self.pools.write().await;

      let Some(pools) = guard.take() else {
         return Ok(()); // already idle
      };

      // This will await all readers to be returned
      pools.read_pool.close().await;

      // Checkpoint WAL before closing the write connection to flush changes
      // and truncate the WAL file. Only attempted if a write ever happened.
      if self.wal_initialized.load(Ordering::SeqCst)
         && let Ok(mut conn) = pools.write_conn.acquire().await
      {
         let _ = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&mut *conn)
            .await;
      }

      pools.write_conn.close().await;

      debug!(url = %self.url(), "released idle catalog connections");

      Ok(())
   }

   /// Canonical address of the backing store.
   ///
   /// Stable for the lifetime of the handle; unaffected by `close()`.
   pub fn url(&self) -> String {
      if is_memory_database(&self.path) {
         "sqlite::memory:".to_string()
      } else {
         format!("sqlite:{}", self.path.display())
      }
   }

   /// The identifying label this handle was constructed with, if any.
   pub fn application_name(&self) -> Option<&str> {
      self.application_name.as_deref()
   }

   /// Get the current pools, opening them if the handle is idle.
   async fn pools(&self) -> Result<PoolSet> {
      if let Some(pools) = self.pools.read().await.as_ref() {
         return Ok(pools.clone());
      }

      let mut guard = self.pools.write().await;

      // Another task may have opened the pools while we waited for the lock
      if let Some(pools) = guard.as_ref() {
         return Ok(pools.clone());
      }

      debug!(
         url = %self.url(),
         application_name = self.application_name.as_deref().unwrap_or("-"),
         "opening catalog connection pools"
      );

      let pools = Self::open_pools(&self.path, &self.config).await?;
      *guard = Some(pools.clone());

      Ok(pools)
   }

   async fn open_pools(path: &Path, config: &CatalogConfig) -> Result<PoolSet> {
      if is_memory_database(path) {
         // A single persistent read-write connection serves both roles.
         // Separate pools would each get a private, empty database, and a
         // recycled connection would silently drop all data.
         let options = SqliteConnectOptions::new()
            .filename(path)
            .foreign_keys(true);

         let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

         return Ok(PoolSet {
            read_pool: pool.clone(),
            write_conn: pool,
         });
      }

      // If the database file doesn't exist, create it with a temporary
      // connection. We can't rely on `create_if_missing(true)` on the pools:
      // if the very first query went through the read pool, its read-only
      // connections could not create the file.
      if !path.exists() {
         let create_options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .read_only(false);

         let conn = create_options.connect().await?;
         drop(conn); // Close immediately after creating the file
      }

      let read_options = SqliteConnectOptions::new()
         .filename(path)
         .read_only(true)
         .foreign_keys(true)
         .busy_timeout(Duration::from_secs(5));

      let read_pool = SqlitePoolOptions::new()
         .max_connections(config.max_read_connections)
         .min_connections(0)
         .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
         .connect_with(read_options)
         .await?;

      let write_options = SqliteConnectOptions::new()
         .filename(path)
         .read_only(false)
         .foreign_keys(true)
         .busy_timeout(Duration::from_secs(5));

      let write_conn = SqlitePoolOptions::new()
         .max_connections(1)
         .min_connections(0)
         .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
         .connect_with(write_options)
         .await?;

      Ok(PoolSet {
         read_pool,
         write_conn,
      })
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn memory_config() -> CatalogConfig {
      CatalogConfig {
         path: ":memory:".into(),
         ..Default::default()
      }
   }

   #[tokio::test]
   async fn test_empty_path_rejected() {
      let config = CatalogConfig::default();
      let result = CatalogDb::from_config(&config, None, false).await;
      assert!(matches!(result, Err(Error::EmptyPath)));
   }

   #[tokio::test]
   async fn test_memory_url() {
      let db = CatalogDb::from_config(&memory_config(), None, true)
         .await
         .unwrap();
      assert_eq!(db.url(), "sqlite::memory:");
   }

   #[tokio::test]
   async fn test_application_name_override() {
      let mut config = memory_config();
      config.application_name = Some("from-config".into());

      let db = CatalogDb::from_config(&config, Some("explicit"), false)
         .await
         .unwrap();
      assert_eq!(db.application_name(), Some("explicit"));

      let db = CatalogDb::from_config(&config, None, false).await.unwrap();
      assert_eq!(db.application_name(), Some("from-config"));
   }

   #[tokio::test]
   async fn test_memory_read_and_write_share_a_connection() {
      let db = CatalogDb::from_config(&memory_config(), None, true)
         .await
         .unwrap();

      let mut writer = db.acquire_writer().await.unwrap();
      sqlx::query("CREATE TABLE t (id INTEGER)")
         .execute(&mut *writer)
         .await
         .unwrap();
      drop(writer);

      // Visible through the read pool because both roles share the connection
      let result = sqlx::query("SELECT * FROM t")
         .fetch_all(&db.read_pool().await.unwrap())
         .await;
      assert!(result.is_ok());
   }

   #[tokio::test]
   async fn test_init_seeds_roles_once() {
      let db = CatalogDb::from_config(&memory_config(), None, true)
         .await
         .unwrap();

      assert!(db.init(true).await.unwrap());
      assert!(!db.init(true).await.unwrap());

      let (roles,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM role")
         .fetch_one(&db.read_pool().await.unwrap())
         .await
         .unwrap();
      assert_eq!(roles, ACCESS_ROLES.len() as i64);
   }

   #[tokio::test]
   async fn test_init_without_permissions_skips_role_tables() {
      let db = CatalogDb::from_config(&memory_config(), None, true)
         .await
         .unwrap();

      assert!(db.init(false).await.unwrap());

      let result = sqlx::query("SELECT * FROM role")
         .fetch_all(&db.read_pool().await.unwrap())
         .await;
      assert!(result.is_err(), "role table should not exist");
   }
}
