//! HTTP route handlers for the Vecho API.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::services::ServeDir;
use tracing::info;

use crate::conversations::{RecentChat, recent_chats};
use crate::llm::Mode;
use crate::storage::{DEFAULT_USER_ID, MessageRecord, NewMessage, UserRecord};

use super::errors::ApiError;
use super::extract::{ApiJson, ApiQuery};
use super::state::AppState;

const DEFAULT_USERNAME: &str = "Guest";

/// Create the API router with all routes. Paths outside the API are served
/// from the configured static directory.
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat))
        .route("/api/history", get(history))
        .route("/api/recent-chats", get(recent))
        .route("/api/user", post(create_user).get(get_user))
        .route("/api/chats", delete(delete_chats))
        .fallback_service(static_files)
        .with_state(state)
}

const fn default_user_id() -> i64 {
    DEFAULT_USER_ID
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (model, degraded) = match state.provider.get_if_ready() {
        Some(provider) => (
            Some(provider.current_model().await),
            provider.is_degraded().await,
        ),
        None => (None, false),
    };

    Json(json!({
        "status": "ok",
        "service": "vecho",
        "version": env!("CARGO_PKG_VERSION"),
        "model": model,
        "degraded": degraded,
    }))
}

/// Chat request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    #[serde(default)]
    pub message: String,
    /// Owning user.
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    /// Response mode name; unknown names answer as `qa`.
    #[serde(default)]
    pub mode: Option<String>,
}

/// Chat response.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// The assistant's reply.
    pub response: String,
    /// When the exchange was recorded (RFC 3339, UTC).
    pub timestamp: String,
}

/// Answer a message and record the exchange.
async fn chat(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("Message cannot be empty".to_string()));
    }

    let mode = request.mode.as_deref().map_or_else(Mode::default, Mode::from_name);
    let provider = state.provider.get().await?;
    let reply = provider.respond(message, mode).await;

    let exchange = NewMessage::now(request.user_id, message, reply);
    let timestamp = exchange.created_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let response = exchange.reply.clone();
    let id = state.messages.insert(exchange).await?;
    info!(user_id = request.user_id, chat_id = id, %mode, "Recorded exchange");

    Ok(Json(ChatResponse {
        response,
        timestamp,
    }))
}

/// Query naming a user.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    /// User identifier.
    #[serde(default = "default_user_id")]
    pub user_id: i64,
}

/// One exchange in the history.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    /// What the user sent.
    pub user_message: String,
    /// What the assistant answered.
    pub ai_response: String,
    /// Stored timestamp.
    pub timestamp: String,
}

impl From<MessageRecord> for HistoryEntry {
    fn from(record: MessageRecord) -> Self {
        Self {
            user_message: record.message,
            ai_response: record.reply,
            timestamp: record.timestamp,
        }
    }
}

/// History response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Latest exchanges, newest first.
    pub history: Vec<HistoryEntry>,
}

async fn history(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let records = state
        .messages
        .recent_for_user(query.user_id, state.config.history_limit)
        .await?;

    Ok(Json(HistoryResponse {
        history: records.into_iter().map(HistoryEntry::from).collect(),
    }))
}

/// Query for the recent-chats list.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    /// User identifier.
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    /// Maximum number of conversations.
    pub limit: Option<usize>,
}

/// Recent-chats response.
#[derive(Debug, Serialize)]
pub struct RecentChatsResponse {
    /// Conversations, most recent first.
    pub recent_chats: Vec<RecentChat>,
}

async fn recent(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> Result<Json<RecentChatsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(state.config.recent_chats_limit);
    let records = state.messages.list_for_user(query.user_id).await?;

    Ok(Json(RecentChatsResponse {
        recent_chats: recent_chats(&records, limit, Utc::now()),
    }))
}

/// User creation request.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Display name, `Guest` when absent.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional email address.
    #[serde(default)]
    pub email: Option<String>,
}

/// User creation response.
#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    /// New user identifier.
    pub user_id: i64,
    /// Stored display name.
    pub username: String,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>, ApiError> {
    let username = request.username.as_deref().unwrap_or(DEFAULT_USERNAME);
    let user = state.users.create(username, request.email.as_deref()).await?;
    info!(user_id = user.user_id, "Created user");

    Ok(Json(CreateUserResponse {
        user_id: user.user_id,
        username: user.username,
    }))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<UserRecord>, ApiError> {
    let user = state
        .users
        .get(query.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", query.user_id)))?;

    Ok(Json(user))
}

/// Deletion response.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Number of exchanges removed.
    pub deleted_count: u64,
}

async fn delete_chats(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted_count = state.messages.delete_for_user(query.user_id).await?;
    info!(user_id = query.user_id, deleted_count, "Deleted chats");

    Ok(Json(DeleteResponse {
        message: format!("Successfully deleted {deleted_count} chat(s)"),
        deleted_count,
    }))
}
