//! Model preference and fallback.

use crate::llm::backend::ModelInfo;

/// Names of the models that can answer prompts, in listing order.
///
/// When no listed model advertises text generation, every listed model is
/// returned so selection still has candidates.
#[must_use]
pub fn usable_models(models: &[ModelInfo]) -> Vec<String> {
    let generating: Vec<String> = models
        .iter()
        .filter(|m| m.supports_generation())
        .map(|m| m.name.clone())
        .collect();

    if generating.is_empty() {
        models.iter().map(|m| m.name.clone()).collect()
    } else {
        generating
    }
}

/// Choose a model: the first preferred name that is available, otherwise the
/// first available model. `excluded` is never chosen.
#[must_use]
pub fn select_model(
    preferred: &[String],
    available: &[String],
    excluded: Option<&str>,
) -> Option<String> {
    let allowed = |name: &&String| Some(name.as_str()) != excluded;

    preferred
        .iter()
        .filter(allowed)
        .find(|name| available.contains(name))
        .or_else(|| available.iter().find(allowed))
        .cloned()
}
