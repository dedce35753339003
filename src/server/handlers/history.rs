use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::config::settings::history_limit;
use crate::core::errors::ApiError;
use crate::core::security::{require_api_key, require_owner};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

fn resolve_limit(state: &AppState, query: &HistoryQuery) -> Result<i64, ApiError> {
    match query.limit {
        Some(limit) if limit > 0 => Ok(limit),
        Some(_) => Err(ApiError::BadRequest("limit must be positive".to_string())),
        None => Ok(history_limit(&state.config)),
    }
}

pub async fn search_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    let owner = require_owner(&headers)?;
    let limit = resolve_limit(&state, &query)?;

    let entries = state.history.list_search_history(&owner, limit).await?;
    Ok(Json(json!({ "searches": entries })))
}

pub async fn chat_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    let owner = require_owner(&headers)?;
    let limit = resolve_limit(&state, &query)?;

    let turns = state.history.list_chat_history(&owner, limit).await?;
    Ok(Json(json!({ "history": turns })))
}

/// Forgets the caller: chat turns, search queries and their results.
pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_api_key(&headers, &state.session_token)?;
    let owner = require_owner(&headers)?;

    state.history.delete_owner(&owner).await?;
    tracing::info!(owner = owner.id(), "history deleted");
    Ok(StatusCode::NO_CONTENT)
}
