//! # catalog-conn-mgr
//!
//! A minimal wrapper around SQLx that manages the single SQLite connection
//! handle behind the catalog index.
//!
//! ## Core Types
//!
//! - **[`CatalogDb`]**: the connection handle with separate read and write connection pools
//! - **[`CatalogConfig`]**: connection parameters and pool settings
//! - **[`WriteGuard`]**: RAII guard ensuring exclusive write access
//! - **[`Error`]**: error type for connection and bootstrap operations
//!
//! ## Architecture
//!
//! - **Connection pooling**: separate read-only pool and write pool with a max of 1 connection
//! - **Reopenable lifecycle**: `close()` releases idle connections; the next acquisition
//!   transparently reopens the pools, so a closed handle never becomes unusable
//! - **Lazy WAL mode**: Write-Ahead Logging enabled automatically on first write
//! - **Idempotent bootstrap**: `init()` creates the catalog schema once and reports
//!   whether this call was the first-time creation
//!
//! ## Usage
//!
//! ```no_run
//! use catalog_conn_mgr::{CatalogConfig, CatalogDb};
//!
//! #[tokio::main]
//! async fn main() -> catalog_conn_mgr::Result<()> {
//!     let config = CatalogConfig {
//!         path: "catalog.db".into(),
//!         ..Default::default()
//!     };
//!
//!     let db = CatalogDb::from_config(&config, Some("my-app"), true).await?;
//!
//!     // One-time schema creation (safe to call repeatedly)
//!     let is_new = db.init(true).await?;
//!     println!("first run: {is_new}");
//!
//!     // Release idle connections; the handle stays usable
//!     db.close().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod database;
mod error;
mod write_guard;

// Re-export public types
pub use config::CatalogConfig;
pub use database::CatalogDb;
pub use error::Error;
pub use write_guard::WriteGuard;

/// A type alias for Results with our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
