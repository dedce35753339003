use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::agent::assistant::AssistantReply;
use crate::agent::persona::AssistantPersona;
use crate::core::errors::ApiError;
use crate::core::security::{owner_from_headers, require_api_key};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RankedSource {
    pub position: u32,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct TeacherChatResponse {
    pub response: String,
    pub sources_count: usize,
    pub sources: Vec<RankedSource>,
}

impl From<AssistantReply> for TeacherChatResponse {
    fn from(reply: AssistantReply) -> Self {
        let sources: Vec<RankedSource> = reply
            .sources
            .into_iter()
            .map(|source| RankedSource {
                position: source.position,
                title: source.title,
                url: source.url,
            })
            .collect();
        Self {
            response: reply.response,
            sources_count: sources.len(),
            sources,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LinkSource {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct StudentChatResponse {
    pub response: String,
    pub sources: Vec<LinkSource>,
}

impl From<AssistantReply> for StudentChatResponse {
    fn from(reply: AssistantReply) -> Self {
        Self {
            response: reply.response,
            sources: reply
                .sources
                .into_iter()
                .map(|source| LinkSource {
                    title: source.title,
                    url: source.url,
                })
                .collect(),
        }
    }
}

pub async fn teacher_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let reply = run_turn(&state, &headers, payload, AssistantPersona::Teacher).await?;
    Ok(Json(TeacherChatResponse::from(reply)))
}

pub async fn student_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let reply = run_turn(&state, &headers, payload, AssistantPersona::Student).await?;
    Ok(Json(StudentChatResponse::from(reply)))
}

async fn run_turn(
    state: &AppState,
    headers: &HeaderMap,
    payload: ChatPayload,
    persona: AssistantPersona,
) -> Result<AssistantReply, ApiError> {
    require_api_key(headers, &state.session_token)?;

    let message = payload.message.unwrap_or_default();
    if message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message is required".to_string()));
    }

    let assistant = state.assistant(persona).map_err(|err| {
        tracing::error!(persona = persona.as_str(), "assistant is not configured: {}", err);
        err
    })?;
    let owner = owner_from_headers(headers);

    assistant.respond(&message, owner.as_ref()).await
}
