//! The index facade: one connection handle, four resource registries

use crate::datasets::DatasetResource;
use crate::error::Result;
use crate::metadata_types::{MetadataTypeResource, default_metadata_type_docs};
use crate::products::ProductResource;
use crate::users::UserResource;
use catalog_conn_mgr::{CatalogConfig, CatalogDb};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// Access to the catalog index.
///
/// Owns exactly one [`CatalogDb`] connection handle and the four resource
/// registries that share it, exposed as public fields for direct use:
/// [`datasets`](Index::datasets), [`products`](Index::products),
/// [`metadata_types`](Index::metadata_types), [`users`](Index::users).
///
/// Thread safe: one `Index` (it is cheaply cloneable) may be used
/// concurrently from many tasks within a process. **Not** multiprocess safe
/// once a connection is made - connections cannot be shared across a fork.
/// Either call [`close`](Index::close) before forking (only safe when no
/// other connection is active) or construct a separate `Index` per process.
///
/// # Example
///
/// ```no_run
/// use catalog_index::{CatalogConfig, Index};
///
/// # async fn example() -> catalog_index::Result<()> {
/// let config = CatalogConfig { path: "catalog.db".into(), ..Default::default() };
/// let index = Index::from_config(&config, Some("demo"), true).await?;
///
/// index.init_db(true, true).await?;
///
/// for metadata_type in index.metadata_types.list().await? {
///     println!("{}", metadata_type.name);
/// }
///
/// index.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Index {
   db: Arc<CatalogDb>,

   /// Store and retrieve metadata types.
   pub metadata_types: MetadataTypeResource,

   /// Store and retrieve products. Depends on `metadata_types`.
   pub products: ProductResource,

   /// Store and retrieve datasets. Depends on `products`.
   pub datasets: DatasetResource,

   /// User account management.
   pub users: UserResource,
}

impl Index {
   /// Build an index over an already-constructed connection handle.
   ///
   /// Registries are wired in dependency order: metadata types before
   /// products, products before datasets. The registry constructors take
   /// their dependency by value, so no other order compiles.
   pub fn new(db: Arc<CatalogDb>) -> Self {
      let users = UserResource::new(Arc::clone(&db));
      let metadata_types = MetadataTypeResource::new(Arc::clone(&db));
      let products = ProductResource::new(Arc::clone(&db), metadata_types.clone());
      let datasets = DatasetResource::new(Arc::clone(&db), products.clone());

      Self {
         db,
         metadata_types,
         products,
         datasets,
         users,
      }
   }

   /// Construct an index from configuration.
   ///
   /// Delegates connection construction (and eager validation, when
   /// `validate_connection` is set) to [`CatalogDb::from_config`];
   /// connectivity failures surface unchanged, with no retries at this
   /// layer.
   pub async fn from_config(
      config: &CatalogConfig,
      application_name: Option<&str>,
      validate_connection: bool,
   ) -> Result<Self> {
      let db = CatalogDb::from_config(config, application_name, validate_connection).await?;
      Ok(Self::new(db))
   }

   /// Initialize the catalog, creating the schema if needed.
   ///
   /// Returns `true` iff this call performed the first-time schema creation.
   /// On first-time creation with `with_default_types`, the built-in
   /// metadata-type documents are seeded through the metadata-type registry,
   /// each add taking a table-level lock to guard against a concurrent
   /// first-run from another process. If the schema already existed, no
   /// seeding happens regardless of the flag.
   ///
   /// A failure mid-seeding leaves earlier defaults in place; re-running is
   /// safe because identical re-adds are no-ops.
   pub async fn init_db(&self, with_default_types: bool, with_permissions: bool) -> Result<bool> {
      let is_new = self.db.init(with_permissions).await?;

      if is_new && with_default_types {
         info!("adding default metadata types");
         for doc in default_metadata_type_docs() {
            let record = self.metadata_types.from_doc(&doc)?;
            self.metadata_types.add(&record, true).await?;
         }
      }

      Ok(is_new)
   }

   /// Release any idle database connections.
   ///
   /// Good practice if you are keeping the `Index` in scope but won't be
   /// using it for a while. The index stays usable: a later operation
   /// transparently re-acquires a connection. Idempotent.
   pub async fn close(&self) -> Result<()> {
      self.db.close().await?;
      Ok(())
   }

   /// Canonical address of the backing store. Stable across `close()`.
   pub fn url(&self) -> String {
      self.db.url()
   }

   /// The underlying connection handle, for advanced usage.
   pub fn db(&self) -> &Arc<CatalogDb> {
      &self.db
   }

   /// Run a unit of work against this index, always releasing idle
   /// connections on the way out.
   ///
   /// The scope-exit guarantee of a context manager, as a combinator:
   /// `close()` is awaited whether the closure succeeds or fails. On the
   /// failure path the closure's error wins and a close failure is only
   /// logged; on the success path a close failure propagates.
   ///
   /// # Example
   ///
   /// ```no_run
   /// use catalog_index::{CatalogConfig, Index};
   ///
   /// # async fn example() -> catalog_index::Result<()> {
   /// let config = CatalogConfig { path: "catalog.db".into(), ..Default::default() };
   /// let index = Index::from_config(&config, None, true).await?;
   ///
   /// let count = index
   ///     .scoped(|index| async move { index.datasets.count().await })
   ///     .await?;
   /// println!("{count} datasets");
   /// # Ok(())
   /// # }
   /// ```
   pub async fn scoped<T, Fut>(self, f: impl FnOnce(Index) -> Fut) -> Result<T>
   where
      Fut: Future<Output = Result<T>>,
   {
      let result = f(self.clone()).await;
      let closed = self.close().await;

      match result {
         Ok(value) => {
            closed?;
            Ok(value)
         }
         Err(err) => {
            if let Err(close_err) = closed {
               error!(error = %close_err, "failed to release connections after scoped error");
            }
            Err(err)
         }
      }
   }
}

impl fmt::Debug for Index {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "Index<db={}>", self.url())
   }
}
