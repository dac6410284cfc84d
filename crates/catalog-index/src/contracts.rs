//! Capability traits for the four resource registries
//!
//! The facade wires and exposes the concrete SQLite-backed registries
//! directly; these traits are the seam for code that wants to stay
//! backend-independent (and for alternative index drivers). Each trait is
//! the minimal per-entity contract: parse a document, add, fetch, list.

use crate::datasets::{Dataset, DatasetResource};
use crate::error::Result;
use crate::metadata_types::{MetadataType, MetadataTypeResource};
use crate::products::{Product, ProductResource};
use crate::users::{User, UserResource};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Contract of the metadata-type registry.
#[async_trait]
pub trait MetadataTypeStore: Send + Sync {
   fn from_doc(&self, doc: &JsonValue) -> Result<MetadataType>;
   async fn add(&self, record: &MetadataType, allow_table_lock: bool) -> Result<MetadataType>;
   async fn get_by_name(&self, name: &str) -> Result<Option<MetadataType>>;
   async fn list(&self) -> Result<Vec<MetadataType>>;
}

/// Contract of the product registry.
#[async_trait]
pub trait ProductStore: Send + Sync {
   fn from_doc(&self, doc: &JsonValue) -> Result<Product>;
   async fn add(&self, record: &Product) -> Result<Product>;
   async fn get_by_name(&self, name: &str) -> Result<Option<Product>>;
   async fn list(&self) -> Result<Vec<Product>>;
}

/// Contract of the dataset registry.
#[async_trait]
pub trait DatasetStore: Send + Sync {
   async fn add(&self, metadata: &JsonValue, product_name: &str) -> Result<Dataset>;
   async fn get(&self, id: &str) -> Result<Option<Dataset>>;
   async fn list(&self) -> Result<Vec<Dataset>>;
   async fn count(&self) -> Result<i64>;
}

/// Contract of the user registry.
#[async_trait]
pub trait UserStore: Send + Sync {
   async fn create_user(&self, username: &str, role: &str, description: Option<&str>)
   -> Result<()>;
   async fn delete_user(&self, username: &str) -> Result<()>;
   async fn grant_role(&self, role: &str, usernames: &[&str]) -> Result<()>;
   async fn list_users(&self) -> Result<Vec<User>>;
}

#[async_trait]
impl MetadataTypeStore for MetadataTypeResource {
   fn from_doc(&self, doc: &JsonValue) -> Result<MetadataType> {
      MetadataTypeResource::from_doc(self, doc)
   }

   async fn add(&self, record: &MetadataType, allow_table_lock: bool) -> Result<MetadataType> {
      MetadataTypeResource::add(self, record, allow_table_lock).await
   }

   async fn get_by_name(&self, name: &str) -> Result<Option<MetadataType>> {
      MetadataTypeResource::get_by_name(self, name).await
   }

   async fn list(&self) -> Result<Vec<MetadataType>> {
      MetadataTypeResource::list(self).await
   }
}

#[async_trait]
impl ProductStore for ProductResource {
   fn from_doc(&self, doc: &JsonValue) -> Result<Product> {
      ProductResource::from_doc(self, doc)
   }

   async fn add(&self, record: &Product) -> Result<Product> {
      ProductResource::add(self, record).await
   }

   async fn get_by_name(&self, name: &str) -> Result<Option<Product>> {
      ProductResource::get_by_name(self, name).await
   }

   async fn list(&self) -> Result<Vec<Product>> {
      ProductResource::list(self).await
   }
}

#[async_trait]
impl DatasetStore for DatasetResource {
   async fn add(&self, metadata: &JsonValue, product_name: &str) -> Result<Dataset> {
      DatasetResource::add(self, metadata, product_name).await
   }

   async fn get(&self, id: &str) -> Result<Option<Dataset>> {
      DatasetResource::get(self, id).await
   }

   async fn list(&self) -> Result<Vec<Dataset>> {
      DatasetResource::list(self).await
   }

   async fn count(&self) -> Result<i64> {
      DatasetResource::count(self).await
   }
}

#[async_trait]
impl UserStore for UserResource {
   async fn create_user(
      &self,
      username: &str,
      role: &str,
      description: Option<&str>,
   ) -> Result<()> {
      UserResource::create_user(self, username, role, description).await
   }

   async fn delete_user(&self, username: &str) -> Result<()> {
      UserResource::delete_user(self, username).await
   }

   async fn grant_role(&self, role: &str, usernames: &[&str]) -> Result<()> {
      UserResource::grant_role(self, role, usernames).await
   }

   async fn list_users(&self) -> Result<Vec<User>> {
      UserResource::list_users(self).await
   }
}
