use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{debug, info};

use super::db::DbHandle;
#[cfg(test)]
use super::db::CheckerDb;
use super::models::{Checker, CheckerId};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// A request body the JSON extractor refused, with its status (422 for a
    /// schema mismatch, 400 for malformed JSON).
    Rejected(StatusCode, String),
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Rejected(status, msg) => (status, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

fn internal(e: anyhow::Error) -> ApiError {
    ApiError::Internal(format!("{:#}", e))
}

fn parse_id(raw: &str) -> Result<CheckerId, ApiError> {
    CheckerId::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/c", get(list_checkers))
        .route(
            "/c/{id}",
            get(get_checker).put(put_checker).delete(delete_checker),
        )
        .route("/c/{id}/publish", post(publish_checker))
        .route("/c/{id}/published", get(get_published))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_checkers(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let checkers = state
        .db
        .call(move |db| db.list_checkers())
        .await
        .map_err(internal)?;
    Ok(Json(checkers))
}

async fn get_checker(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let lookup = id.clone();
    let checker = state
        .db
        .call(move |db| db.get_checker(&lookup))
        .await
        .map_err(internal)?;
    match checker {
        Some(checker) => Ok(Json(checker)),
        None => Err(ApiError::NotFound(format!("Checker {} not found", id))),
    }
}

/// Overwrite the stored document. The body must pass the document schema
/// (422 otherwise) and carry the same id as the path.
async fn put_checker(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Result<Json<Checker>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let Json(checker) = body?;
    if checker.id != id {
        return Err(ApiError::BadRequest(format!(
            "Body id '{}' does not match path id '{}'",
            checker.id, id
        )));
    }
    let stored = state
        .db
        .call(move |db| db.put_checker(&checker))
        .await
        .map_err(internal)?;
    debug!(checker = %stored.id, "checker saved");
    Ok(Json(stored))
}

async fn delete_checker(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let lookup = id.clone();
    let deleted = state
        .db
        .call(move |db| db.delete_checker(&lookup))
        .await
        .map_err(internal)?;
    match deleted {
        true => {
            info!(checker = %id, "checker deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        false => Err(ApiError::NotFound(format!("Checker {} not found", id))),
    }
}

async fn publish_checker(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let lookup = id.clone();
    let published = state
        .db
        .call(move |db| db.publish_checker(&lookup))
        .await
        .map_err(internal)?;
    match published {
        Some(published) => {
            info!(checker = %id, snapshot = published.id, "checker published");
            Ok((StatusCode::CREATED, Json(published)))
        }
        None => Err(ApiError::NotFound(format!("Checker {} not found", id))),
    }
}

async fn get_published(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let lookup = id.clone();
    let published = state
        .db
        .call(move |db| db.latest_published(&lookup))
        .await
        .map_err(internal)?;
    match published {
        Some(published) => Ok(Json(published)),
        None => Err(ApiError::NotFound(format!(
            "Checker {} has not been published",
            id
        ))),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
