//! Configuration for the catalog connection handle

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Connection parameters and pool settings for [`CatalogDb`](crate::CatalogDb)
///
/// Callers typically deserialize this from whatever configuration source the
/// application uses; parsing the source itself is not this crate's concern.
///
/// # Examples
///
/// ```
/// use catalog_conn_mgr::CatalogConfig;
///
/// // Use pool defaults, point at a database file
/// let config = CatalogConfig {
///     path: "catalog.db".into(),
///     ..Default::default()
/// };
///
/// // Customize pool settings
/// let config = CatalogConfig {
///     path: "catalog.db".into(),
///     application_name: Some("ingest-worker".into()),
///     max_read_connections: 3,
///     idle_timeout_secs: 60,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
   /// Path to the SQLite database file (created if missing).
   ///
   /// `:memory:` opens a private in-memory database, useful for tests.
   pub path: PathBuf,

   /// Identifying label attached to this connection handle.
   ///
   /// Surfaced in tracing output so concurrent applications sharing one
   /// catalog file can be told apart. An explicit label passed to
   /// `CatalogDb::from_config` overrides this value.
   pub application_name: Option<String>,

   /// Maximum number of concurrent read connections
   ///
   /// This controls the size of the read-only connection pool.
   ///
   /// Default: 6
   pub max_read_connections: u32,

   /// Idle timeout for both read and write connections (in seconds)
   ///
   /// Connections that remain idle for this duration are closed
   /// automatically, independently of explicit `close()` calls.
   ///
   /// Default: 30
   pub idle_timeout_secs: u64,
}

impl Default for CatalogConfig {
   fn default() -> Self {
      Self {
         path: PathBuf::new(),
         application_name: None,
         max_read_connections: 6,
         idle_timeout_secs: 30,
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_defaults() {
      let config = CatalogConfig::default();
      assert_eq!(config.max_read_connections, 6);
      assert_eq!(config.idle_timeout_secs, 30);
      assert!(config.application_name.is_none());
   }

   #[test]
   fn test_deserialize_partial() {
      let config: CatalogConfig =
         serde_json::from_str(r#"{"path": "x.db", "application_name": null, "max_read_connections": 2, "idle_timeout_secs": 10}"#)
            .unwrap();
      assert_eq!(config.max_read_connections, 2);
   }
}
