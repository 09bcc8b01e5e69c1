//! Gemini REST client implementing [`GenerativeBackend`].
//!
//! - `GET {base}/{version}/models` (paginated) lists models.
//! - `POST {base}/{version}/models/{model}:generateContent` generates text.
//!
//! HTTP 429 and `RESOURCE_EXHAUSTED` answers map to
//! [`GenerationError::RateLimited`].

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::llm::backend::{BackendFuture, GenerativeBackend, ModelInfo};
use crate::llm::errors::{GenerationError, GenerationResult};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Page size requested when listing models.
const LIST_PAGE_SIZE: &str = "1000";

/// Upstream status string for exhausted quotas.
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<RemoteModel>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteModel {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl From<RemoteModel> for ModelInfo {
    fn from(model: RemoteModel) -> Self {
        let name = model
            .name
            .rsplit_once('/')
            .map_or(model.name.as_str(), |(_, short)| short)
            .to_string();
        Self {
            name,
            generation_methods: model.supported_generation_methods,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// HTTP client for the Gemini API.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_version: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl GeminiBackend {
    /// Create a client from upstream settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &UpstreamConfig) -> GenerationResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            api_key: config.api_key.clone(),
            timeout: config.request_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{path}", self.base_url, self.api_version)
    }

    async fn send(&self, request: RequestBuilder) -> GenerationResult<Response> {
        let request = match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        };
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status.as_u16(), &body))
    }

    fn transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.timeout)
        } else {
            GenerationError::Http(err)
        }
    }

    async fn list_page(&self, page_token: Option<&str>) -> GenerationResult<ListModelsResponse> {
        let mut request = self
            .client
            .get(self.endpoint("models"))
            .query(&[("pageSize", LIST_PAGE_SIZE)]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        self.send(request)
            .await?
            .json::<ListModelsResponse>()
            .await
            .map_err(|e| self.transport_error(e))
    }
}

impl GenerativeBackend for GeminiBackend {
    fn list_models(&self) -> BackendFuture<'_, GenerationResult<Vec<ModelInfo>>> {
        Box::pin(async move {
            let mut models = Vec::new();
            let mut page_token: Option<String> = None;

            loop {
                let page = self.list_page(page_token.as_deref()).await?;
                models.extend(page.models.into_iter().map(ModelInfo::from));

                match page.next_page_token.filter(|t| !t.is_empty()) {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }

            debug!("Listed {} models", models.len());
            Ok(models)
        })
    }

    fn generate<'a>(
        &'a self,
        model: &'a str,
        prompt: &'a str,
    ) -> BackendFuture<'a, GenerationResult<String>> {
        Box::pin(async move {
            let body = GenerateRequest {
                contents: [Content {
                    role: "user",
                    parts: [Part { text: prompt }],
                }],
            };
            let request = self
                .client
                .post(self.endpoint(&format!("models/{model}:generateContent")))
                .json(&body);

            let response = self
                .send(request)
                .await?
                .json::<GenerateResponse>()
                .await
                .map_err(|e| self.transport_error(e))?;
            extract_text(response)
        })
    }
}

/// Turn a non-success answer into the matching error.
fn classify_failure(status: u16, body: &str) -> GenerationError {
    let (message, upstream_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.trim().to_string(), String::new()),
    };

    if status == 429 || upstream_status == RESOURCE_EXHAUSTED {
        GenerationError::RateLimited(message)
    } else {
        GenerationError::Status { status, message }
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateResponse) -> GenerationResult<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(GenerationError::Malformed(reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GenerationError::Malformed(
            "candidate contained no text".to_string(),
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_names_lose_prefix() {
        let remote: ListModelsResponse = serde_json::from_str(
            r#"{"models":[
                {"name":"models/gemini-1.5-flash","supportedGenerationMethods":["generateContent","countTokens"]},
                {"name":"embedding-001","supportedGenerationMethods":["embedContent"]}
            ],"nextPageToken":"abc"}"#,
        )
        .unwrap();

        assert_eq!(remote.next_page_token.as_deref(), Some("abc"));
        let models: Vec<ModelInfo> = remote.models.into_iter().map(ModelInfo::from).collect();
        assert_eq!(models[0].name, "gemini-1.5-flash");
        assert!(models[0].supports_generation());
        assert_eq!(models[1].name, "embedding-001");
        assert!(!models[1].supports_generation());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"student."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Hello, student.");
    }

    #[test]
    fn test_extract_text_reports_block_reason() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        match extract_text(response) {
            Err(GenerationError::Malformed(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_classify_quota_failures() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            classify_failure(429, body),
            GenerationError::RateLimited(ref m) if m == "Quota exceeded"
        ));

        let body = r#"{"error":{"code":403,"message":"out of credits","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(classify_failure(403, body).is_rate_limited());
    }

    #[test]
    fn test_classify_other_failures() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        let err = classify_failure(400, body);
        assert!(!err.is_rate_limited());
        assert_eq!(err.to_string(), "upstream returned 400: API key not valid");

        let err = classify_failure(502, "Bad Gateway");
        assert!(matches!(err, GenerationError::Status { status: 502, .. }));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = UpstreamConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..UpstreamConfig::default()
        };
        let backend = GeminiBackend::new(&config).unwrap();
        assert_eq!(
            backend.endpoint("models/gemini-pro:generateContent"),
            "http://localhost:8080/v1beta/models/gemini-pro:generateContent"
        );
    }
}
