//! Reply generation on top of a [`GenerativeBackend`].
//!
//! The provider picks a model once at start-up. When a call fails because the
//! model's quota is exhausted, it switches to another available model and
//! retries the request once. Every other failure is turned into a polite reply
//! so callers always get text back.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use crate::config::UpstreamConfig;
use crate::llm::backend::GenerativeBackend;
use crate::llm::errors::{GenerationError, GenerationResult, ProviderInitError};
use crate::llm::prompt::Mode;
use crate::llm::selection::{select_model, usable_models};

/// Reply when every model has run out of quota.
pub const EXHAUSTED_MESSAGE: &str = "I've reached my free usage limit for all available models. \
                                     Please try again in a few minutes.";

/// Reply when the replacement model is rate limited as well.
pub const RATE_LIMITED_MESSAGE: &str =
    "Usage limit reached. Please wait a moment before trying again.";

/// Reply for any failure that is not about quota.
#[must_use]
pub fn apology(err: &GenerationError) -> String {
    format!("I apologize, but I encountered an error: {err}. Please try again.")
}

/// Settings the provider needs from the upstream configuration.
#[derive(Clone, Debug)]
pub struct ProviderSettings {
    /// Model preference order.
    pub preferred_models: Vec<String>,
    /// Name used in prompts.
    pub assistant_name: String,
    /// Bound on a single generation call.
    pub timeout: Duration,
}

impl From<&UpstreamConfig> for ProviderSettings {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            preferred_models: config.preferred_models.clone(),
            assistant_name: config.assistant_name.clone(),
            timeout: config.request_timeout,
        }
    }
}

/// Generates replies and tracks the model currently in use.
pub struct ResponseProvider {
    backend: Arc<dyn GenerativeBackend>,
    preferred: Vec<String>,
    available: Vec<String>,
    initial_model: String,
    current: RwLock<String>,
    assistant_name: String,
    timeout: Duration,
}

impl ResponseProvider {
    /// List the backend's models and select the one to start with.
    ///
    /// # Errors
    /// Returns an error if listing fails, nothing is listed, or no model can
    /// be selected.
    pub async fn connect(
        backend: Arc<dyn GenerativeBackend>,
        settings: ProviderSettings,
    ) -> Result<Self, ProviderInitError> {
        let models = backend.list_models().await?;
        for model in &models {
            debug!(
                "Found model {} ({})",
                model.name,
                model.generation_methods.join(", ")
            );
        }

        let available = usable_models(&models);
        let model = select_model(&settings.preferred_models, &available, None)
            .ok_or(ProviderInitError::NoModels)?;

        if settings.preferred_models.contains(&model) {
            info!("Using model {model}");
        } else {
            warn!("No preferred model available, falling back to {model}");
        }

        Ok(Self {
            backend,
            preferred: settings.preferred_models,
            available,
            initial_model: model.clone(),
            current: RwLock::new(model),
            assistant_name: settings.assistant_name,
            timeout: settings.timeout,
        })
    }

    /// Model currently answering requests.
    pub async fn current_model(&self) -> String {
        self.current.read().await.clone()
    }

    /// Whether the provider has moved off the model it started with.
    pub async fn is_degraded(&self) -> bool {
        *self.current.read().await != self.initial_model
    }

    /// Produce a reply for `message` in the given mode. Never fails: errors
    /// are reported as reply text.
    pub async fn respond(&self, message: &str, mode: impl Into<Mode>) -> String {
        let mode = mode.into();
        let prompt = mode.build_prompt(&self.assistant_name, message);
        let model = self.current_model().await;
        debug!("Generating {mode} reply with {model}");

        match self.generate(&model, &prompt).await {
            Ok(text) => text,
            Err(err) if err.is_rate_limited() => {
                warn!("Model {model} is rate limited: {err}");
                self.recover_from_quota(&model, &prompt).await
            }
            Err(err) => {
                warn!("Generation with {model} failed: {err}");
                apology(&err)
            }
        }
    }

    async fn recover_from_quota(&self, failed: &str, prompt: &str) -> String {
        let Some(model) = self.switch_model(failed).await else {
            warn!("No model left to switch to after {failed} ran out of quota");
            return EXHAUSTED_MESSAGE.to_string();
        };

        match self.generate(&model, prompt).await {
            Ok(text) => text,
            Err(err) if err.is_rate_limited() => {
                warn!("Replacement model {model} is rate limited too: {err}");
                RATE_LIMITED_MESSAGE.to_string()
            }
            Err(err) => {
                warn!("Retry with {model} failed: {err}");
                apology(&err)
            }
        }
    }

    /// Move off `failed`. If another request already switched, its choice is
    /// kept. Returns `None` when no alternative exists.
    async fn switch_model(&self, failed: &str) -> Option<String> {
        let mut current = self.current.write().await;
        if current.as_str() != failed {
            return Some(current.clone());
        }

        let next = select_model(&self.preferred, &self.available, Some(failed))?;
        info!("Switching model from {failed} to {next}");
        *current = next.clone();
        Some(next)
    }

    async fn generate(&self, model: &str, prompt: &str) -> GenerationResult<String> {
        tokio::time::timeout(self.timeout, self.backend.generate(model, prompt))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))?
    }
}

/// A provider that is initialized on first use and then shared.
///
/// Concurrent first callers wait on a single initialization. A failed
/// initialization is not cached; the next call tries again.
pub struct SharedProvider {
    backend: Arc<dyn GenerativeBackend>,
    settings: ProviderSettings,
    cell: OnceCell<ResponseProvider>,
}

impl SharedProvider {
    /// Wrap a backend; nothing is contacted until [`SharedProvider::get`].
    #[must_use]
    pub fn new(backend: Arc<dyn GenerativeBackend>, settings: ProviderSettings) -> Self {
        Self {
            backend,
            settings,
            cell: OnceCell::new(),
        }
    }

    /// The provider, initializing it if needed.
    ///
    /// # Errors
    /// Returns the initialization error when the provider cannot be built.
    pub async fn get(&self) -> Result<&ResponseProvider, ProviderInitError> {
        self.cell
            .get_or_try_init(|| {
                ResponseProvider::connect(Arc::clone(&self.backend), self.settings.clone())
            })
            .await
    }

    /// The provider if it has already been initialized.
    #[must_use]
    pub fn get_if_ready(&self) -> Option<&ResponseProvider> {
        self.cell.get()
    }
}
