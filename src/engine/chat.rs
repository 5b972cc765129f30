use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::chat::{ChatEvent, ChatMessage, ChatThread, SenderType, ThreadId};
use crate::state::AppState;

/// Appends a message, creating the thread on first write. Thread creation
/// is a single idempotent upsert (`entry().or_insert_with`), so two racing
/// first writers land in the same thread.
pub fn send(
    state: &AppState,
    thread_id: ThreadId,
    sender_id: Uuid,
    sender_name: String,
    sender_type: SenderType,
    text: String,
) -> Result<ChatMessage, AppError> {
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation("message text cannot be empty".to_string()));
    }

    // Order threads know their parties up front; register them so unread
    // counters accrue even before they send their first message.
    let mut referenced = Vec::new();
    if let ThreadId::Order(order_id) = thread_id {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        referenced.push((order.customer_id, "customer"));
        referenced.push((order.restaurant_id, "restaurant"));
        if let Some(driver_id) = order.driver_id {
            referenced.push((driver_id, "driver"));
        }
    }

    let message = {
        let mut thread = state
            .chat_threads
            .entry(thread_id)
            .or_insert_with(|| ChatThread::new(thread_id));

        for (participant_id, role) in referenced {
            thread.track(participant_id, role);
        }
        thread.append(sender_id, sender_name, sender_type, text)
    };

    state.metrics.messages_total.inc();
    state.publish_chat_event(ChatEvent {
        thread_id,
        message: message.clone(),
    });

    info!(thread_id = %thread_id, sender_id = %sender_id, seq = message.seq, "message sent");
    Ok(message)
}

/// Resets the participant's unread counter. Idempotent; a thread that has
/// never been written to has nothing to reset.
pub fn mark_read(state: &AppState, thread_id: ThreadId, participant_id: Uuid) {
    if let Some(mut thread) = state.chat_threads.get_mut(&thread_id) {
        thread.mark_read(participant_id);
    }
}

/// Badge total across every thread the participant is part of. Threads not
/// yet created simply contribute zero. Admins pass `ADMIN_POOL_ID`.
pub fn total_unread(state: &AppState, participant_id: Uuid) -> u32 {
    state
        .chat_threads
        .iter()
        .map(|entry| entry.value().unread_for(participant_id))
        .sum()
}

/// Everything written to the thread so far, in timestamp-then-sequence
/// order. The starting point of a restartable subscription.
pub fn backlog(state: &AppState, thread_id: ThreadId) -> Vec<ChatMessage> {
    state
        .chat_threads
        .get(&thread_id)
        .map(|thread| thread.messages.clone())
        .unwrap_or_default()
}
