//! `SQLite` persistence for users and chat messages.
//!
//! Both stores share one [`tokio_rusqlite::Connection`] opened by [`Database`].

pub mod database;
pub mod errors;
pub mod message_store;
pub mod user_store;

use std::future::Future;
use std::pin::Pin;

pub use database::Database;
pub use errors::{StorageError, StorageResult};
pub use message_store::{MessageRecord, MessageStore, NewMessage, SqliteMessageStore};
pub use user_store::{DEFAULT_USER_ID, SqliteUserStore, UserRecord, UserStore};

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
