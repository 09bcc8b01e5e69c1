//! In-process backend used by tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::llm::backend::{BackendFuture, GenerativeBackend, ModelInfo};
use crate::llm::errors::{GenerationError, GenerationResult};

/// What a scripted call does.
#[derive(Clone, Debug)]
pub enum Outcome {
    Text(String),
    RateLimited,
    Fail(String),
    Hang,
}

/// Backend whose answers are queued per model. Models without queued
/// outcomes answer `"<model>: ok"`.
#[derive(Default)]
pub struct ScriptedBackend {
    models: Vec<ModelInfo>,
    listing_failures: AtomicUsize,
    outcomes: Mutex<HashMap<String, VecDeque<Outcome>>>,
    calls: Mutex<Vec<(String, String)>>,
    list_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn with_models(names: &[&str]) -> Self {
        Self {
            models: names
                .iter()
                .map(|name| ModelInfo::new(*name, ["generateContent"]))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing_listings(self, count: usize) -> Self {
        self.listing_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn script(self, model: &str, outcome: Outcome) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// `(model, prompt)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of generation calls made with `model`.
    pub fn calls_to(&self, model: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == model)
            .count()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

impl GenerativeBackend for ScriptedBackend {
    fn list_models(&self) -> BackendFuture<'_, GenerationResult<Vec<ModelInfo>>> {
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            // Yield so concurrent initializers overlap.
            tokio::task::yield_now().await;

            let pending_failures = self.listing_failures.load(Ordering::SeqCst);
            if pending_failures > 0 {
                self.listing_failures.store(pending_failures - 1, Ordering::SeqCst);
                return Err(GenerationError::Status {
                    status: 503,
                    message: "listing unavailable".to_string(),
                });
            }
            Ok(self.models.clone())
        })
    }

    fn generate<'a>(
        &'a self,
        model: &'a str,
        prompt: &'a str,
    ) -> BackendFuture<'a, GenerationResult<String>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));
            // Yield so concurrent requests interleave.
            tokio::task::yield_now().await;

            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .get_mut(model)
                .and_then(VecDeque::pop_front);

            match outcome {
                None => Ok(format!("{model}: ok")),
                Some(Outcome::Text(text)) => Ok(text),
                Some(Outcome::RateLimited) => Err(GenerationError::RateLimited(format!(
                    "Quota exceeded for {model}"
                ))),
                Some(Outcome::Fail(message)) => Err(GenerationError::Status {
                    status: 500,
                    message,
                }),
                Some(Outcome::Hang) => {
                    std::future::pending::<()>().await;
                    Ok(String::new())
                }
            }
        })
    }
}
