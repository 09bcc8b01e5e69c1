//! Database handle shared by the stores.

use std::sync::Arc;

use tokio_rusqlite::Connection;
use tracing::info;

use crate::config::StorageConfig;
use crate::storage::errors::StorageResult;
use crate::storage::message_store::SqliteMessageStore;
use crate::storage::user_store::SqliteUserStore;

/// An open `SQLite` database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Connection>,
}

impl Database {
    /// Open (creating if needed) the database at the configured path.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened.
    pub async fn open(config: &StorageConfig) -> StorageResult<Self> {
        if let Some(parent) = config.sqlite_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.sqlite_path).await?;
        info!("Opened database at {}", config.sqlite_path.display());
        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if `SQLite` cannot allocate the database.
    pub async fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Shared connection handle.
    #[must_use]
    pub fn connection(&self) -> Arc<Connection> {
        Arc::clone(&self.conn)
    }

    /// Create the message store, initializing its schema.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub async fn message_store(&self) -> StorageResult<SqliteMessageStore> {
        SqliteMessageStore::new(self.connection()).await
    }

    /// Create the user store, initializing its schema.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub async fn user_store(&self) -> StorageResult<SqliteUserStore> {
        SqliteUserStore::new(self.connection()).await
    }
}
