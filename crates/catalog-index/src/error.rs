/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for catalog index operations.
///
/// No variant is recovered from locally - everything surfaces to the caller,
/// and the index remains usable after any failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from the connection handle (connectivity, schema bootstrap).
   #[error(transparent)]
   Connection(#[from] catalog_conn_mgr::Error),

   /// Error from SQLx operations issued by a resource.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// A stored document failed to parse as JSON.
   #[error("stored document is not valid JSON: {0}")]
   Json(#[from] serde_json::Error),

   /// A document handed to `from_doc` is structurally invalid.
   #[error("invalid document: {0}")]
   InvalidDocument(String),

   /// A record with the same name/id already exists with a different definition.
   #[error("duplicate record: {0}")]
   DuplicateRecord(String),

   /// A referenced record does not exist.
   #[error("missing record: {0}")]
   MissingRecord(String),

   /// A user or grant referenced an access role the schema does not define.
   #[error("unknown access role '{0}'")]
   UnknownRole(String),
}
