use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::engine::chat;
use crate::error::AppError;
use crate::models::chat::ThreadId;
use crate::state::AppState;

/// Live order change feed: every committed stage change, assignment and
/// promotion lands here as a JSON `OrderEvent`.
pub async fn ws_orders(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| order_feed(socket, state))
}

async fn order_feed(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.order_events_tx.subscribe());

    info!("order feed client connected");

    let send_task = tokio::spawn(async move {
        while let Some(item) = events.next().await {
            // A lagged subscriber skips ahead; the store stays the source
            // of truth, the feed is only a change notification.
            let Ok(event) = item else { continue };

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize order event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("order feed client disconnected");
}

/// Restartable per-thread message stream: replays the backlog, then follows
/// the live feed. Dropping the socket cancels the subscription.
pub async fn ws_thread(
    ws: WebSocketUpgrade,
    Path(thread_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let thread_id: ThreadId = thread_id
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid thread id: {thread_id}")))?;

    Ok(ws.on_upgrade(move |socket| thread_feed(socket, state, thread_id)))
}

async fn thread_feed(socket: WebSocket, state: Arc<AppState>, thread_id: ThreadId) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the backlog so nothing falls in the gap;
    // anything seen twice is dropped by the sequence check below.
    let mut events = BroadcastStream::new(state.chat_events_tx.subscribe());
    let backlog = chat::backlog(&state, thread_id);
    let mut last_seq = backlog.last().map(|m| m.seq);

    info!(thread_id = %thread_id, "thread feed client connected");

    let send_task = tokio::spawn(async move {
        for message in backlog {
            let Ok(json) = serde_json::to_string(&message) else {
                continue;
            };
            if sender.send(Message::Text(json)).await.is_err() {
                return;
            }
        }

        while let Some(item) = events.next().await {
            let Ok(event) = item else { continue };
            if event.thread_id != thread_id {
                continue;
            }
            if last_seq.is_some_and(|seq| event.message.seq <= seq) {
                continue;
            }
            last_seq = Some(event.message.seq);

            let json = match serde_json::to_string(&event.message) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize chat message for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!(thread_id = %thread_id, "thread feed client disconnected");
}
