//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::config::{AppConfig, ServerConfig};
use crate::llm::{GenerativeBackend, ProviderSettings, SharedProvider};
use crate::storage::{Database, MessageStore, StorageResult, UserStore};

/// Shared application state.
pub struct AppState {
    /// Server settings (limits, static directory).
    pub config: ServerConfig,
    /// Chat message store.
    pub messages: Arc<dyn MessageStore>,
    /// User store.
    pub users: Arc<dyn UserStore>,
    /// Lazily initialized response provider.
    pub provider: SharedProvider,
}

impl AppState {
    /// Assemble state from already-built parts.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserStore>,
        provider: SharedProvider,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            messages,
            users,
            provider,
        })
    }

    /// Build state on an open database. The provider is not contacted until
    /// the first chat request.
    ///
    /// # Errors
    /// Returns an error if the store schemas cannot be created.
    pub async fn build(
        config: &AppConfig,
        db: &Database,
        backend: Arc<dyn GenerativeBackend>,
    ) -> StorageResult<Arc<Self>> {
        let messages = db.message_store().await?;
        let users = db.user_store().await?;
        let provider = SharedProvider::new(backend, ProviderSettings::from(&config.upstream));

        Ok(Self::new(
            config.server.clone(),
            Arc::new(messages),
            Arc::new(users),
            provider,
        ))
    }
}
