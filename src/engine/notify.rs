use serde::Serialize;
use uuid::Uuid;

use crate::engine::chat;
use crate::models::order::OrderStage;
use crate::state::AppState;

/// Badge counts surfaced to the UI. Pure aggregation over chat unread
/// counters and order records; rendering is someone else's problem.
#[derive(Debug, Clone, Serialize)]
pub struct Badge {
    pub unread_messages: u32,
    pub actionable_orders: u32,
    pub total: u32,
}

/// An order counts as actionable for the party whose move it is:
/// restaurants on pending orders, drivers on offers they have not yet
/// accepted. Scheduled orders awaiting the restaurant count too.
pub fn badge(state: &AppState, participant_id: Uuid) -> Badge {
    let unread_messages = chat::total_unread(state, participant_id);

    let mut actionable_orders = 0;
    for entry in state.orders.iter() {
        let order = entry.value();
        let awaiting = match order.stage() {
            OrderStage::Pending => order.restaurant_id == participant_id,
            OrderStage::AssignedDriver => order.driver_id == Some(participant_id),
            _ => false,
        };
        if awaiting {
            actionable_orders += 1;
        }
    }

    for entry in state.scheduled_orders.iter() {
        if entry.value().is_pending() && entry.value().restaurant_id == participant_id {
            actionable_orders += 1;
        }
    }

    Badge {
        unread_messages,
        actionable_orders,
        total: unread_messages + actionable_orders,
    }
}
