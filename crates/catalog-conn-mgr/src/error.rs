//! Error types for catalog-conn-mgr

use thiserror::Error;

/// Errors that may occur when working with catalog-conn-mgr
#[derive(Error, Debug)]
pub enum Error {
   /// IO error when accessing database files. Standard library IO errors
   /// are converted to this variant.
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// The configured database path was empty
   #[error("Database path cannot be empty")]
   EmptyPath,
}
