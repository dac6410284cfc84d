//! Dataset registry: cataloged data records referencing a product

use crate::error::{Error, Result};
use crate::products::ProductResource;
use catalog_conn_mgr::CatalogDb;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

/// A cataloged dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
   pub id: String,
   /// Name of the product this dataset belongs to.
   pub product: String,
   /// The dataset's metadata document, stored verbatim.
   pub metadata: JsonValue,
   pub added: Option<OffsetDateTime>,
   /// Set when the dataset has been archived; archived datasets are kept
   /// but excluded from `list()`.
   pub archived: Option<OffsetDateTime>,
}

/// Registry of datasets. Depends on the product registry: every dataset
/// references a product, which must exist before the dataset can be added.
#[derive(Debug, Clone)]
pub struct DatasetResource {
   db: Arc<CatalogDb>,
   products: ProductResource,
}

impl DatasetResource {
   /// Construct the registry. Taking the product registry by value makes
   /// the dependency impossible to omit.
   pub fn new(db: Arc<CatalogDb>, products: ProductResource) -> Self {
      Self { db, products }
   }

   /// The product registry this registry resolves references through.
   pub fn products(&self) -> &ProductResource {
      &self.products
   }

   /// Index a dataset document under the named product.
   ///
   /// Uses the document's `id` field when present, otherwise assigns a
   /// fresh UUID. Idempotent: re-adding an id with identical metadata
   /// returns the stored record; an id collision with different metadata is
   /// an error.
   pub async fn add(&self, metadata: &JsonValue, product_name: &str) -> Result<Dataset> {
      let product = self.products.get_by_name(product_name).await?.ok_or_else(|| {
         Error::MissingRecord(format!("dataset references unknown product '{product_name}'"))
      })?;

      let id = match metadata.get("id").and_then(JsonValue::as_str) {
         Some(id) if !id.is_empty() => id.to_string(),
         _ => Uuid::new_v4().to_string(),
      };

      let mut writer = self.db.acquire_writer().await?;

      let existing: Option<(String, OffsetDateTime, Option<OffsetDateTime>)> =
         sqlx::query_as("SELECT metadata, added, archived FROM dataset WHERE id = ?")
            .bind(&id)
            .fetch_optional(&mut *writer)
            .await?;

      if let Some((stored_metadata, added, archived)) = existing {
         let stored: JsonValue = serde_json::from_str(&stored_metadata)?;
         if stored == *metadata {
            debug!(id = %id, "dataset already indexed, skipping");
            return Ok(Dataset {
               id,
               product: product.name,
               metadata: stored,
               added: Some(added),
               archived,
            });
         }
         return Err(Error::DuplicateRecord(format!(
            "dataset '{id}' already exists with different metadata"
         )));
      }

      let added = OffsetDateTime::now_utc();
      sqlx::query("INSERT INTO dataset (id, product_ref, metadata, added) VALUES (?, ?, ?, ?)")
         .bind(&id)
         .bind(product.id)
         .bind(metadata.to_string())
         .bind(added)
         .execute(&mut *writer)
         .await?;

      Ok(Dataset {
         id,
         product: product.name,
         metadata: metadata.clone(),
         added: Some(added),
         archived: None,
      })
   }

   /// Fetch a dataset by id, archived or not.
   pub async fn get(&self, id: &str) -> Result<Option<Dataset>> {
      let row: Option<(String, String, String, OffsetDateTime, Option<OffsetDateTime>)> =
         sqlx::query_as(
            "SELECT d.id, p.name, d.metadata, d.added, d.archived
             FROM dataset d JOIN product p ON p.id = d.product_ref
             WHERE d.id = ?",
         )
         .bind(id)
         .fetch_optional(&self.db.read_pool().await?)
         .await?;

      row.map(Self::from_row).transpose()
   }

   /// List all active (non-archived) datasets, newest first.
   pub async fn list(&self) -> Result<Vec<Dataset>> {
      let rows: Vec<(String, String, String, OffsetDateTime, Option<OffsetDateTime>)> =
         sqlx::query_as(
            "SELECT d.id, p.name, d.metadata, d.added, d.archived
             FROM dataset d JOIN product p ON p.id = d.product_ref
             WHERE d.archived IS NULL
             ORDER BY d.added DESC, d.id",
         )
         .fetch_all(&self.db.read_pool().await?)
         .await?;

      rows.into_iter().map(Self::from_row).collect()
   }

   /// Count active (non-archived) datasets.
   pub async fn count(&self) -> Result<i64> {
      let (count,): (i64,) =
         sqlx::query_as("SELECT COUNT(*) FROM dataset WHERE archived IS NULL")
            .fetch_one(&self.db.read_pool().await?)
            .await?;

      Ok(count)
   }

   /// Archive a dataset. No-op if it is already archived.
   pub async fn archive(&self, id: &str) -> Result<()> {
      let mut writer = self.db.acquire_writer().await?;

      let updated = sqlx::query("UPDATE dataset SET archived = ? WHERE id = ? AND archived IS NULL")
         .bind(OffsetDateTime::now_utc())
         .bind(id)
         .execute(&mut *writer)
         .await?;

      // Release the writer before reading: in-memory databases serve reads
      // and writes from the same single-connection pool
      drop(writer);

      if updated.rows_affected() == 0 && self.get(id).await?.is_none() {
         return Err(Error::MissingRecord(format!("no dataset '{id}' to archive")));
      }

      Ok(())
   }

   /// Restore an archived dataset. No-op if it is not archived.
   pub async fn restore(&self, id: &str) -> Result<()> {
      let mut writer = self.db.acquire_writer().await?;

      let updated = sqlx::query("UPDATE dataset SET archived = NULL WHERE id = ?")
         .bind(id)
         .execute(&mut *writer)
         .await?;

      if updated.rows_affected() == 0 {
         return Err(Error::MissingRecord(format!("no dataset '{id}' to restore")));
      }

      Ok(())
   }

   fn from_row(
      (id, product, metadata, added, archived): (
         String,
         String,
         String,
         OffsetDateTime,
         Option<OffsetDateTime>,
      ),
   ) -> Result<Dataset> {
      Ok(Dataset {
         id,
         product,
         metadata: serde_json::from_str(&metadata)?,
         added: Some(added),
         archived,
      })
   }
}
