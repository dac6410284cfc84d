//! WriteGuard for exclusive write access to the catalog database

use sqlx::Sqlite;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteConnection;
use std::ops::{Deref, DerefMut};

/// RAII guard for exclusive write access to the catalog's write connection
///
/// This guard wraps a pool connection and returns it to the pool on drop.
/// Only one `WriteGuard` can exist at a time (enforced by max_connections=1),
/// ensuring serialized write access within the process. Registry code that
/// needs to lock out other *processes* too (first-run bootstrap) additionally
/// runs its statements inside `BEGIN EXCLUSIVE` on this connection.
///
/// The guard derefs to `SqliteConnection` allowing direct use with sqlx queries.
///
/// # Example
///
/// ```no_run
/// use catalog_conn_mgr::{CatalogConfig, CatalogDb};
/// use sqlx::query;
///
/// # async fn example() -> Result<(), catalog_conn_mgr::Error> {
/// # let config = CatalogConfig { path: "catalog.db".into(), ..Default::default() };
/// let db = CatalogDb::from_config(&config, None, true).await?;
/// let mut writer = db.acquire_writer().await?;
/// query("INSERT INTO metadata_type (name, definition, added) VALUES (?, ?, ?)")
///     .bind("eo")
///     .bind("{}")
///     .bind("2026-01-01T00:00:00Z")
///     .execute(&mut *writer)
///     .await?;
/// // Writer is automatically returned when dropped
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WriteGuard {
   conn: PoolConnection<Sqlite>,
}

impl WriteGuard {
   /// Create a new WriteGuard by taking ownership of a pool connection
   pub(crate) fn new(conn: PoolConnection<Sqlite>) -> Self {
      Self { conn }
   }
}

impl Deref for WriteGuard {
   type Target = SqliteConnection;

   fn deref(&self) -> &Self::Target {
      &*self.conn
   }
}

impl DerefMut for WriteGuard {
   fn deref_mut(&mut self) -> &mut Self::Target {
      &mut *self.conn
   }
}

// Drop is automatically implemented - PoolConnection returns itself to the pool
