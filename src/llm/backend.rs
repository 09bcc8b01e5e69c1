//! Seam between the provider and a generation service.

use std::future::Future;
use std::pin::Pin;

use crate::llm::errors::GenerationResult;

/// Generation method a model must support to answer prompts.
pub const GENERATE_CONTENT: &str = "generateContent";

/// Boxed future type for backend operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A model reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    /// Model identifier without any `models/` prefix.
    pub name: String,
    /// Generation methods the model supports.
    pub generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Describe a model.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, generation_methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            generation_methods: generation_methods.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the model can answer text prompts.
    #[must_use]
    pub fn supports_generation(&self) -> bool {
        self.generation_methods.iter().any(|m| m == GENERATE_CONTENT)
    }
}

/// A text-generation service.
pub trait GenerativeBackend: Send + Sync {
    /// Enumerate the models the service offers.
    ///
    /// # Errors
    /// Returns an error if the service cannot be reached or answers badly.
    fn list_models(&self) -> BackendFuture<'_, GenerationResult<Vec<ModelInfo>>>;

    /// Generate text for `prompt` with `model`.
    ///
    /// # Errors
    /// Returns [`crate::llm::GenerationError::RateLimited`] when the model's
    /// quota is exhausted, or another error for any other failure.
    fn generate<'a>(
        &'a self,
        model: &'a str,
        prompt: &'a str,
    ) -> BackendFuture<'a, GenerationResult<String>>;
}
