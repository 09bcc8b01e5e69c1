//! Chat message log: one row per exchange.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::conversations::timestamp::format_timestamp;
use crate::storage::StoreFuture;
use crate::storage::errors::{StorageError, StorageResult};

/// A stored exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    /// Row identifier, increasing with insertion order.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// What the user sent.
    pub message: String,
    /// What the assistant answered.
    pub reply: String,
    /// Creation time as stored (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub timestamp: String,
}

/// An exchange to be stored.
#[derive(Clone, Debug)]
pub struct NewMessage {
    /// Owning user.
    pub user_id: i64,
    /// What the user sent; must not be blank.
    pub message: String,
    /// What the assistant answered.
    pub reply: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    /// An exchange stamped with the current time.
    #[must_use]
    pub fn now(user_id: i64, message: impl Into<String>, reply: impl Into<String>) -> Self {
        Self::at(user_id, message, reply, Utc::now())
    }

    /// An exchange stamped with `created_at`.
    #[must_use]
    pub fn at(
        user_id: i64,
        message: impl Into<String>,
        reply: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            message: message.into(),
            reply: reply.into(),
            created_at,
        }
    }
}

/// Message store trait.
pub trait MessageStore: Send + Sync {
    /// Append an exchange and return its identifier.
    ///
    /// # Errors
    /// Returns an error if the message is blank or storage access fails.
    fn insert(&self, message: NewMessage) -> StoreFuture<'_, StorageResult<i64>>;

    /// Load every exchange for a user, newest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn list_for_user(&self, user_id: i64) -> StoreFuture<'_, StorageResult<Vec<MessageRecord>>>;

    /// Load the `limit` newest exchanges for a user, newest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn recent_for_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> StoreFuture<'_, StorageResult<Vec<MessageRecord>>>;

    /// Delete every exchange for a user and return how many were removed.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn delete_for_user(&self, user_id: i64) -> StoreFuture<'_, StorageResult<u64>>;
}

/// `SQLite` implementation of the message store.
pub struct SqliteMessageStore {
    conn: Arc<Connection>,
    table: String,
}

impl SqliteMessageStore {
    /// Table name for chat messages.
    pub const DEFAULT_TABLE: &'static str = "chats";

    /// Initialize the store and create the table if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn new(conn: Arc<Connection>) -> StorageResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    chat_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL,
                    user_message TEXT NOT NULL,
                    ai_response TEXT NOT NULL,
                    timestamp TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{table_name}_user_ts
                    ON {table_name} (user_id, timestamp DESC);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }

    fn select_for_user(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> StoreFuture<'_, StorageResult<Vec<MessageRecord>>> {
        Box::pin(async move {
            let table = self.table.clone();
            // SQLite treats a negative LIMIT as unbounded.
            let limit = limit.unwrap_or(-1);
            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT chat_id, user_id, user_message, ai_response, timestamp
                         FROM {table}
                         WHERE user_id = ?1
                         ORDER BY timestamp DESC, chat_id DESC
                         LIMIT ?2"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![user_id, limit], |row| {
                            Ok(MessageRecord {
                                id: row.get(0)?,
                                user_id: row.get(1)?,
                                message: row.get(2)?,
                                reply: row.get(3)?,
                                timestamp: row.get(4)?,
                            })
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;
            Ok(rows)
        })
    }
}

impl MessageStore for SqliteMessageStore {
    fn insert(&self, message: NewMessage) -> StoreFuture<'_, StorageResult<i64>> {
        Box::pin(async move {
            if message.message.trim().is_empty() {
                return Err(StorageError::InvalidRecord(
                    "message must not be empty".to_string(),
                ));
            }

            let table = self.table.clone();
            let timestamp = format_timestamp(message.created_at);
            let id = self
                .conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO {table} (user_id, user_message, ai_response, timestamp)
                             VALUES (?1, ?2, ?3, ?4)"
                        ),
                        rusqlite::params![
                            message.user_id,
                            message.message,
                            message.reply,
                            timestamp
                        ],
                    )?;
                    Ok(conn.last_insert_rowid())
                })
                .await?;
            Ok(id)
        })
    }

    fn list_for_user(&self, user_id: i64) -> StoreFuture<'_, StorageResult<Vec<MessageRecord>>> {
        self.select_for_user(user_id, None)
    }

    fn recent_for_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> StoreFuture<'_, StorageResult<Vec<MessageRecord>>> {
        Box::pin(async move {
            let limit = i64::try_from(limit)
                .map_err(|_| StorageError::InvalidRecord("limit exceeds i64".to_string()))?;
            self.select_for_user(user_id, Some(limit)).await
        })
    }

    fn delete_for_user(&self, user_id: i64) -> StoreFuture<'_, StorageResult<u64>> {
        Box::pin(async move {
            let table = self.table.clone();
            let deleted = self
                .conn
                .call(move |conn| {
                    let deleted = conn.execute(
                        &format!("DELETE FROM {table} WHERE user_id = ?1"),
                        rusqlite::params![user_id],
                    )?;
                    Ok(deleted)
                })
                .await?;
            u64::try_from(deleted)
                .map_err(|_| StorageError::InvalidRecord("invalid delete count".to_string()))
        })
    }
}
