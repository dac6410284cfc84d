//! Single entry point to the dataset catalog.
//!
//! This crate sits on top of the low-level connection manager
//! (`catalog-conn-mgr`) and provides:
//!
//! - [`Index`] — the facade owning one connection handle and the four
//!   resource registries that share it
//! - [`MetadataTypeResource`], [`ProductResource`], [`DatasetResource`],
//!   [`UserResource`] — SQLite-backed registries, wired in dependency order
//! - Capability traits ([`MetadataTypeStore`], [`ProductStore`],
//!   [`DatasetStore`], [`UserStore`]) for backend-independent callers
//! - The [`drivers`] entry point for pluggable index backends
//!
//! # Example
//!
//! ```no_run
//! use catalog_index::{CatalogConfig, Index};
//! use serde_json::json;
//!
//! # async fn example() -> catalog_index::Result<()> {
//! let config = CatalogConfig { path: "catalog.db".into(), ..Default::default() };
//!
//! let index = Index::from_config(&config, Some("quickstart"), true).await?;
//! index.init_db(true, true).await?;
//!
//! let product = index.products.from_doc(&json!({
//!    "name": "ls8_scenes",
//!    "metadata_type": "eo",
//! }))?;
//! index.products.add(&product).await?;
//!
//! let dataset = index
//!     .datasets
//!     .add(&json!({"id": "6ba4f9b4-7c19-4c7c-b4f5-1fb6f0e0c6d8"}), "ls8_scenes")
//!     .await?;
//! println!("indexed {} into {}", dataset.id, dataset.product);
//!
//! index.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod contracts;
pub mod datasets;
pub mod drivers;
pub mod error;
pub mod index;
pub mod metadata_types;
pub mod products;
pub mod users;

pub use contracts::{DatasetStore, MetadataTypeStore, ProductStore, UserStore};
pub use datasets::{Dataset, DatasetResource};
pub use drivers::{DefaultIndexDriver, IndexDriver, index_driver_init};
pub use error::{Error, Result};
pub use index::Index;
pub use metadata_types::{MetadataType, MetadataTypeResource, default_metadata_type_docs};
pub use products::{Product, ProductResource};
pub use users::{User, UserResource};

// Re-export commonly used types from the connection manager
pub use catalog_conn_mgr::{CatalogConfig, CatalogDb};
