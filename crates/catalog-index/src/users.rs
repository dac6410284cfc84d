//! User registry: catalog accounts and their access roles

use crate::error::{Error, Result};
use catalog_conn_mgr::CatalogDb;
use std::sync::Arc;

/// A catalog user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
   pub username: String,
   pub role: String,
   pub description: Option<String>,
}

/// Registry of user accounts. No dependencies on other registries.
///
/// Requires the access-control tables, i.e. an index initialized with
/// `with_permissions = true`; operations against an index initialized
/// without them surface the underlying database error.
#[derive(Debug, Clone)]
pub struct UserResource {
   db: Arc<CatalogDb>,
}

impl UserResource {
   pub fn new(db: Arc<CatalogDb>) -> Self {
      Self { db }
   }

   /// Create a user account with the given access role.
   pub async fn create_user(
      &self,
      username: &str,
      role: &str,
      description: Option<&str>,
   ) -> Result<()> {
      self.ensure_role_exists(role).await?;

      let mut writer = self.db.acquire_writer().await?;

      sqlx::query("INSERT INTO user_account (username, role, description) VALUES (?, ?, ?)")
         .bind(username)
         .bind(role)
         .bind(description)
         .execute(&mut *writer)
         .await
         .map_err(|err| match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
               Error::DuplicateRecord(format!("user '{username}' already exists"))
            }
            other => Error::Sqlx(other),
         })?;

      Ok(())
   }

   /// Delete a user account.
   pub async fn delete_user(&self, username: &str) -> Result<()> {
      let mut writer = self.db.acquire_writer().await?;

      let deleted = sqlx::query("DELETE FROM user_account WHERE username = ?")
         .bind(username)
         .execute(&mut *writer)
         .await?;

      if deleted.rows_affected() == 0 {
         return Err(Error::MissingRecord(format!("no user '{username}'")));
      }

      Ok(())
   }

   /// Grant an access role to each of the given users.
   pub async fn grant_role(&self, role: &str, usernames: &[&str]) -> Result<()> {
      self.ensure_role_exists(role).await?;

      let mut writer = self.db.acquire_writer().await?;

      for username in usernames {
         let updated = sqlx::query("UPDATE user_account SET role = ? WHERE username = ?")
            .bind(role)
            .bind(username)
            .execute(&mut *writer)
            .await?;

         if updated.rows_affected() == 0 {
            return Err(Error::MissingRecord(format!("no user '{username}'")));
         }
      }

      Ok(())
   }

   /// List all user accounts, ordered by username.
   pub async fn list_users(&self) -> Result<Vec<User>> {
      let rows: Vec<(String, String, Option<String>)> =
         sqlx::query_as("SELECT username, role, description FROM user_account ORDER BY username")
            .fetch_all(&self.db.read_pool().await?)
            .await?;

      Ok(rows
         .into_iter()
         .map(|(username, role, description)| User {
            username,
            role,
            description,
         })
         .collect())
   }

   async fn ensure_role_exists(&self, role: &str) -> Result<()> {
      let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM role WHERE name = ?")
         .bind(role)
         .fetch_one(&self.db.read_pool().await?)
         .await?;

      if count == 0 {
         return Err(Error::UnknownRole(role.to_string()));
      }

      Ok(())
   }
}
