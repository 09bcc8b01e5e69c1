//! User records.

use std::sync::Arc;

use rusqlite::OptionalExtension;
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::storage::StoreFuture;
use crate::storage::errors::{StorageError, StorageResult};

/// User that owns messages when a request names no user.
pub const DEFAULT_USER_ID: i64 = 1;

const DEFAULT_USERNAME: &str = "Guest";

/// A stored user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    /// User identifier.
    pub user_id: i64,
    /// Display name.
    pub username: String,
    /// Email address, unique when present.
    pub email: Option<String>,
}

/// User store trait.
pub trait UserStore: Send + Sync {
    /// Create a user. A blank email is stored as absent.
    ///
    /// # Errors
    /// Returns [`StorageError::Conflict`] if the email is already taken, or an
    /// error if storage access fails.
    fn create(&self, username: &str, email: Option<&str>) -> StoreFuture<'_, StorageResult<UserRecord>>;

    /// Get a user by identifier.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get(&self, user_id: i64) -> StoreFuture<'_, StorageResult<Option<UserRecord>>>;
}

/// `SQLite` implementation of the user store.
pub struct SqliteUserStore {
    conn: Arc<Connection>,
    table: String,
}

impl SqliteUserStore {
    /// Table name for users.
    pub const DEFAULT_TABLE: &'static str = "users";

    /// Initialize the store, create the table and make sure the default user exists.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn new(conn: Arc<Connection>) -> StorageResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL,
                    email TEXT UNIQUE
                )"
            ))?;
            conn.execute(
                &format!("INSERT OR IGNORE INTO {table_name} (user_id, username) VALUES (?1, ?2)"),
                rusqlite::params![DEFAULT_USER_ID, DEFAULT_USERNAME],
            )?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl UserStore for SqliteUserStore {
    fn create(&self, username: &str, email: Option<&str>) -> StoreFuture<'_, StorageResult<UserRecord>> {
        let username = username.trim().to_string();
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);

        Box::pin(async move {
            if username.is_empty() {
                return Err(StorageError::InvalidRecord(
                    "username must not be empty".to_string(),
                ));
            }

            let table = self.table.clone();
            let name = username.clone();
            let address = email.clone();
            let user_id = self
                .conn
                .call(move |conn| {
                    let inserted = conn.execute(
                        &format!("INSERT INTO {table} (username, email) VALUES (?1, ?2)"),
                        rusqlite::params![name, address],
                    );
                    match inserted {
                        Ok(_) => Ok(Some(conn.last_insert_rowid())),
                        Err(rusqlite::Error::SqliteFailure(err, _))
                            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                        {
                            Ok(None)
                        }
                        Err(err) => Err(err.into()),
                    }
                })
                .await?;

            let user_id = user_id.ok_or_else(|| {
                StorageError::Conflict(format!(
                    "email {} is already registered",
                    email.as_deref().unwrap_or_default()
                ))
            })?;

            Ok(UserRecord {
                user_id,
                username,
                email,
            })
        })
    }

    fn get(&self, user_id: i64) -> StoreFuture<'_, StorageResult<Option<UserRecord>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let row = self
                .conn
                .call(move |conn| {
                    let row = conn
                        .query_row(
                            &format!("SELECT user_id, username, email FROM {table} WHERE user_id = ?1"),
                            rusqlite::params![user_id],
                            |row| {
                                Ok(UserRecord {
                                    user_id: row.get(0)?,
                                    username: row.get(1)?,
                                    email: row.get(2)?,
                                })
                            },
                        )
                        .optional()?;
                    Ok(row)
                })
                .await?;
            Ok(row)
        })
    }
}
