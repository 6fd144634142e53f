//! HTTP surface for tagfeed.
//!
//! Thin axum layer over the store traits: identity comes from the
//! `x-user-id` header (the authentication mechanism itself is an external
//! collaborator), bodies are JSON, errors serialize as `{"error": message}`.
//! The router is constructed from an [`AppState`] so integration tests can
//! drive it over the in-memory store without a socket.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use tagfeed_core::defaults::PAGE_SIZE;
use tagfeed_core::{ChatStore, Error, ListTagsFilter, Tag, TagStore};

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub tags: Arc<dyn TagStore>,
    pub chats: Arc<dyn ChatStore>,
    /// Feature switch: when false only the history and health routes mount.
    pub enable_chat_tags: bool,
}

impl AppState {
    pub fn new(tags: Arc<dyn TagStore>, chats: Arc<dyn ChatStore>) -> Self {
        Self {
            tags,
            chats,
            enable_chat_tags: true,
        }
    }

    pub fn with_chat_tags_enabled(mut self, enabled: bool) -> Self {
        self.enable_chat_tags = enabled;
        self
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/api/history", get(list_history));

    if state.enable_chat_tags {
        app = app
            .route(
                "/api/chat-tag",
                get(chat_tag_lookup).post(attach_tag).delete(detach_tag),
            )
            .route("/api/tag", get(list_tag_catalog).post(create_tag))
            .route(
                "/api/tag/:id",
                get(get_tag).put(rename_tag).delete(delete_tag),
            );
    } else {
        info!(subsystem = "api", "chat tags disabled, tag routes not mounted");
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Opaque authenticated user identity, taken from the `x-user-id` header.
pub struct UserId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_string()))
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))
    }
}

// =============================================================================
// HEALTH
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// CHAT-TAG ASSOCIATION HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChatTagLookupParams {
    #[serde(rename = "chatId")]
    chat_id: Option<Uuid>,
    #[serde(rename = "tagId")]
    tag_id: Option<Uuid>,
    all: Option<String>,
}

async fn chat_tag_lookup(
    State(state): State<AppState>,
    user: UserId,
    Query(params): Query<ChatTagLookupParams>,
) -> Result<impl IntoResponse, ApiError> {
    // Bulk snapshot for the whole user, grouped by chat.
    if params.all.as_deref() == Some("true") {
        let by_chat: HashMap<Uuid, Vec<Tag>> =
            state.tags.all_associations_for_user(&user.0).await?;
        return Ok(Json(serde_json::to_value(by_chat)?));
    }

    if let Some(chat_id) = params.chat_id {
        let tags = state.tags.list_tags_for_chat(chat_id).await?;
        return Ok(Json(serde_json::to_value(tags)?));
    }

    if let Some(tag_id) = params.tag_id {
        let chats = state.tags.list_chats_for_tag(tag_id).await?;
        return Ok(Json(serde_json::to_value(chats)?));
    }

    Err(ApiError::BadRequest(
        "chatId, tagId, or all=true required".to_string(),
    ))
}

#[derive(Debug, Deserialize)]
struct ChatTagBody {
    #[serde(rename = "chatId")]
    chat_id: Option<Uuid>,
    #[serde(rename = "tagId")]
    tag_id: Option<Uuid>,
}

impl ChatTagBody {
    fn require(self) -> Result<(Uuid, Uuid), ApiError> {
        match (self.chat_id, self.tag_id) {
            (Some(chat_id), Some(tag_id)) => Ok((chat_id, tag_id)),
            _ => Err(ApiError::BadRequest(
                "chatId and tagId are required".to_string(),
            )),
        }
    }
}

async fn attach_tag(
    State(state): State<AppState>,
    _user: UserId,
    Json(body): Json<ChatTagBody>,
) -> Result<impl IntoResponse, ApiError> {
    let (chat_id, tag_id) = body.require()?;
    let created = state.tags.attach(chat_id, tag_id).await?;
    Ok(Json(serde_json::to_value(created)?))
}

async fn detach_tag(
    State(state): State<AppState>,
    _user: UserId,
    Json(body): Json<ChatTagBody>,
) -> Result<impl IntoResponse, ApiError> {
    let (chat_id, tag_id) = body.require()?;
    state.tags.detach(chat_id, tag_id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// =============================================================================
// TAG CATALOG HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
struct CatalogParams {
    name: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
    active: Option<String>,
    #[serde(rename = "withUsage")]
    with_usage: Option<String>,
}

/// Catalog listing variants are read-permissive: no identity required.
async fn list_tag_catalog(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> Result<impl IntoResponse, ApiError> {
    // Exact-name lookup returns a single tag or 404.
    if let Some(name) = params.name {
        let filter = ListTagsFilter {
            by_name: Some(name.clone()),
            ..Default::default()
        };
        let tags = state.tags.list_tags(filter).await?;
        let tag = tags
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;
        return Ok(Json(serde_json::to_value(tag)?));
    }

    let filter = ListTagsFilter {
        by_creator: params.user_id,
        active_only: params.active.as_deref() == Some("true"),
        with_usage_count: params.with_usage.as_deref() == Some("true"),
        ..Default::default()
    };
    let tags = state.tags.list_tags(filter).await?;
    Ok(Json(serde_json::to_value(tags)?))
}

#[derive(Debug, Deserialize)]
struct TagNameBody {
    name: Option<String>,
}

async fn create_tag(
    State(state): State<AppState>,
    user: UserId,
    Json(body): Json<TagNameBody>,
) -> Result<impl IntoResponse, ApiError> {
    let name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Name is required".to_string()))?;

    let created = state.tags.create_tag(&name, &user.0).await?;
    info!(
        subsystem = "api",
        op = "create_tag",
        tag_id = %created.id,
        tag_name = %created.name,
        "tag created"
    );
    Ok((StatusCode::CREATED, Json(serde_json::to_value(created)?)))
}

async fn get_tag(
    State(state): State<AppState>,
    _user: UserId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state.tags.get_tag(id).await?;
    Ok(Json(serde_json::to_value(tag)?))
}

async fn rename_tag(
    State(state): State<AppState>,
    user: UserId,
    Path(id): Path<Uuid>,
    Json(body): Json<TagNameBody>,
) -> Result<impl IntoResponse, ApiError> {
    let name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Name is required".to_string()))?;

    // Creator-only: check ownership before mutating.
    let existing = state.tags.get_tag(id).await?;
    if existing.created_by != user.0 {
        return Err(ApiError::Forbidden("Forbidden".to_string()));
    }

    let updated = state.tags.update_tag(id, &name).await?;
    Ok(Json(serde_json::to_value(updated)?))
}

async fn delete_tag(
    State(state): State<AppState>,
    user: UserId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state.tags.get_tag(id).await?;
    if existing.created_by != user.0 {
        return Err(ApiError::Forbidden("Forbidden".to_string()));
    }

    let deleted = state.tags.delete_tag(id).await?;
    info!(
        subsystem = "api",
        op = "delete_tag",
        tag_id = %deleted.id,
        "tag deleted"
    );
    Ok(Json(serde_json::json!({
        "success": true,
        "deleted": deleted,
    })))
}

// =============================================================================
// CHAT HISTORY HANDLER
// =============================================================================

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
    ending_before: Option<Uuid>,
}

async fn list_history(
    State(state): State<AppState>,
    user: UserId,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(PAGE_SIZE);
    let page = state
        .chats
        .list_chats(&user.0, limit, params.ending_before)
        .await?;
    Ok(Json(serde_json::to_value(page)?))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    Internal(Error),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::TagNotFound(_) | Error::ChatNotFound(_) => ApiError::NotFound(err.to_string()),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Unauthenticated(msg) => ApiError::Unauthorized(msg),
            Error::Forbidden(msg) => ApiError::Forbidden(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(Error::Serialization(err.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
