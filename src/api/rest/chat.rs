use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::{chat, notify};
use crate::error::AppError;
use crate::models::chat::{ChatMessage, SenderType, ThreadId};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/threads/:thread_id/messages",
            post(send_message).get(thread_messages),
        )
        .route("/threads/:thread_id/read", post(mark_read))
        .route("/participants/:id/unread", get(unread_count))
        .route("/participants/:id/badge", get(badge))
}

fn parse_thread_id(raw: &str) -> Result<ThreadId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid thread id: {raw}")))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_type: SenderType,
    pub text: String,
}

#[derive(Deserialize)]
pub struct MarkReadRequest {
    pub participant_id: Uuid,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<ChatMessage>, AppError> {
    let thread_id = parse_thread_id(&thread_id)?;
    chat::send(
        &state,
        thread_id,
        payload.sender_id,
        payload.sender_name,
        payload.sender_type,
        payload.text,
    )
    .map(Json)
}

async fn thread_messages(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let thread_id = parse_thread_id(&thread_id)?;
    Ok(Json(chat::backlog(&state, thread_id)))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(payload): Json<MarkReadRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let thread_id = parse_thread_id(&thread_id)?;
    chat::mark_read(&state, thread_id, payload.participant_id);
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

async fn unread_count(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Json<serde_json::Value> {
    let unread = chat::total_unread(&state, id);
    Json(serde_json::json!({ "participant_id": id, "unread": unread }))
}

async fn badge(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Json<notify::Badge> {
    Json(notify::badge(&state, id))
}
