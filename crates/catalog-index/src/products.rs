//! Product registry: named dataset-type definitions referencing a metadata type

use crate::error::{Error, Result};
use crate::metadata_types::MetadataTypeResource;
use catalog_conn_mgr::CatalogDb;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;

/// A product (dataset-type) definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
   pub id: Option<i64>,
   pub name: String,
   /// Name of the metadata type this product's datasets conform to.
   pub metadata_type: String,
   pub definition: JsonValue,
   pub added: Option<OffsetDateTime>,
}

/// Registry of products. Depends on the metadata-type registry: every
/// product references a metadata type, which must exist before the product
/// can be added.
#[derive(Debug, Clone)]
pub struct ProductResource {
   db: Arc<CatalogDb>,
   metadata_types: MetadataTypeResource,
}

impl ProductResource {
   /// Construct the registry. Taking the metadata-type registry by value
   /// makes the dependency impossible to omit.
   pub fn new(db: Arc<CatalogDb>, metadata_types: MetadataTypeResource) -> Self {
      Self { db, metadata_types }
   }

   /// The metadata-type registry this registry resolves references through.
   pub fn metadata_types(&self) -> &MetadataTypeResource {
      &self.metadata_types
   }

   /// Parse a raw product document into an unstored [`Product`].
   ///
   /// The document must carry a non-empty string `name` and a string
   /// `metadata_type` naming the schema its datasets conform to.
   pub fn from_doc(&self, doc: &JsonValue) -> Result<Product> {
      let name = doc
         .get("name")
         .and_then(JsonValue::as_str)
         .filter(|name| !name.is_empty())
         .ok_or_else(|| Error::InvalidDocument("product document has no name".into()))?;

      let metadata_type = doc
         .get("metadata_type")
         .and_then(JsonValue::as_str)
         .filter(|mt| !mt.is_empty())
         .ok_or_else(|| {
            Error::InvalidDocument(format!("product '{name}' names no metadata_type"))
         })?;

      Ok(Product {
         id: None,
         name: name.to_string(),
         metadata_type: metadata_type.to_string(),
         definition: doc.clone(),
         added: None,
      })
   }

   /// Store a product, returning the stored record.
   ///
   /// Fails with [`Error::MissingRecord`] if the referenced metadata type is
   /// not indexed. Idempotent for identical re-adds; a name collision with a
   /// different definition is an error.
   pub async fn add(&self, record: &Product) -> Result<Product> {
      let metadata_type = self
         .metadata_types
         .get_by_name(&record.metadata_type)
         .await?
         .ok_or_else(|| {
            Error::MissingRecord(format!(
               "product '{}' references unknown metadata type '{}'",
               record.name, record.metadata_type
            ))
         })?;

      let mut writer = self.db.acquire_writer().await?;

      let existing: Option<(i64, String, OffsetDateTime)> =
         sqlx::query_as("SELECT id, definition, added FROM product WHERE name = ?")
            .bind(&record.name)
            .fetch_optional(&mut *writer)
            .await?;

      if let Some((id, definition, added)) = existing {
         let stored: JsonValue = serde_json::from_str(&definition)?;
         if stored == record.definition {
            debug!(name = %record.name, "product already indexed, skipping");
            return Ok(Product {
               id: Some(id),
               name: record.name.clone(),
               metadata_type: record.metadata_type.clone(),
               definition: stored,
               added: Some(added),
            });
         }
         return Err(Error::DuplicateRecord(format!(
            "product '{}' already exists with a different definition",
            record.name
         )));
      }

      let added = OffsetDateTime::now_utc();
      let inserted = sqlx::query(
         "INSERT INTO product (name, metadata_type_ref, definition, added) VALUES (?, ?, ?, ?)",
      )
      .bind(&record.name)
      .bind(metadata_type.id)
      .bind(record.definition.to_string())
      .bind(added)
      .execute(&mut *writer)
      .await?;

      Ok(Product {
         id: Some(inserted.last_insert_rowid()),
         name: record.name.clone(),
         metadata_type: record.metadata_type.clone(),
         definition: record.definition.clone(),
         added: Some(added),
      })
   }

   /// Fetch a product by id.
   pub async fn get(&self, id: i64) -> Result<Option<Product>> {
      let row: Option<(i64, String, String, String, OffsetDateTime)> = sqlx::query_as(
         "SELECT p.id, p.name, m.name, p.definition, p.added
          FROM product p JOIN metadata_type m ON m.id = p.metadata_type_ref
          WHERE p.id = ?",
      )
      .bind(id)
      .fetch_optional(&self.db.read_pool().await?)
      .await?;

      row.map(Self::from_row).transpose()
   }

   /// Fetch a product by name.
   pub async fn get_by_name(&self, name: &str) -> Result<Option<Product>> {
      let row: Option<(i64, String, String, String, OffsetDateTime)> = sqlx::query_as(
         "SELECT p.id, p.name, m.name, p.definition, p.added
          FROM product p JOIN metadata_type m ON m.id = p.metadata_type_ref
          WHERE p.name = ?",
      )
      .bind(name)
      .fetch_optional(&self.db.read_pool().await?)
      .await?;

      row.map(Self::from_row).transpose()
   }

   /// List all products, ordered by name.
   pub async fn list(&self) -> Result<Vec<Product>> {
      let rows: Vec<(i64, String, String, String, OffsetDateTime)> = sqlx::query_as(
         "SELECT p.id, p.name, m.name, p.definition, p.added
          FROM product p JOIN metadata_type m ON m.id = p.metadata_type_ref
          ORDER BY p.name",
      )
      .fetch_all(&self.db.read_pool().await?)
      .await?;

      rows.into_iter().map(Self::from_row).collect()
   }

   fn from_row(
      (id, name, metadata_type, definition, added): (i64, String, String, String, OffsetDateTime),
   ) -> Result<Product> {
      Ok(Product {
         id: Some(id),
         name,
         metadata_type,
         definition: serde_json::from_str(&definition)?,
         added: Some(added),
      })
   }
}
