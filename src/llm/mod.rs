//! Upstream text generation.
//!
//! - `backend`: the seam to a generation service (list models, generate)
//! - `gemini`: HTTP implementation against the Gemini REST API
//! - `selection`: model preference and fallback, free of I/O
//! - `prompt`: response modes and their prompt templates
//! - `provider`: reply generation with quota-driven model switching

pub mod backend;
pub mod errors;
pub mod gemini;
pub mod prompt;
pub mod provider;
pub mod selection;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BackendFuture, GenerativeBackend, ModelInfo};
pub use errors::{GenerationError, GenerationResult, ProviderInitError};
pub use gemini::GeminiBackend;
pub use prompt::Mode;
pub use provider::{ProviderSettings, ResponseProvider, SharedProvider};
pub use selection::{select_model, usable_models};
