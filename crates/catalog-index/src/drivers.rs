//! Index driver entry point
//!
//! The index facade is one entry in a pluggable-backend mechanism: external
//! glue asks a driver to connect, rather than naming [`Index`] directly.
//! Discovery/registration of drivers is out of scope here; this module only
//! provides the default driver and its init hook.

use crate::error::Result;
use crate::index::Index;
use async_trait::async_trait;
use catalog_conn_mgr::CatalogConfig;

/// A backend capable of producing a connected [`Index`].
#[async_trait]
pub trait IndexDriver: Send + Sync {
   async fn connect_to_index(
      &self,
      config: &CatalogConfig,
      application_name: Option<&str>,
      validate_connection: bool,
   ) -> Result<Index>;
}

/// The built-in SQLite-backed index driver.
#[derive(Debug, Default)]
pub struct DefaultIndexDriver;

#[async_trait]
impl IndexDriver for DefaultIndexDriver {
   async fn connect_to_index(
      &self,
      config: &CatalogConfig,
      application_name: Option<&str>,
      validate_connection: bool,
   ) -> Result<Index> {
      Index::from_config(config, application_name, validate_connection).await
   }
}

/// Registration hook for the driver mechanism.
pub fn index_driver_init() -> DefaultIndexDriver {
   DefaultIndexDriver
}
