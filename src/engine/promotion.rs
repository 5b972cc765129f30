use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{Order, OrderEvent, OrderStage};
use crate::models::scheduled::{ScheduledOrder, ScheduledStatus};
use crate::state::AppState;

/// The live order a scheduled order promotes into. Deterministic, so a
/// retried promotion upserts the same order instead of minting a second one.
pub fn live_order_id(scheduled_id: Uuid) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, scheduled_id.as_bytes())
}

/// Converts a scheduled order into a live accepted order, then deletes the
/// scheduled entry. Create-then-delete is at-least-once: if the delete is
/// lost, retrying re-applies both steps without duplicating the live order.
pub fn promote(state: &AppState, scheduled_id: Uuid) -> Result<Order, AppError> {
    let live_id = live_order_id(scheduled_id);

    let Some(entry) = state.scheduled_orders.get(&scheduled_id) else {
        // Already promoted and deleted; the retry just returns the live
        // order it produced.
        if let Some(order) = state.orders.get(&live_id) {
            return Ok(order.clone());
        }
        return Err(AppError::NotFound(format!(
            "scheduled order {scheduled_id} not found"
        )));
    };
    let scheduled = entry.clone();
    drop(entry);

    if !scheduled.is_pending() {
        state
            .metrics
            .promotions_total
            .with_label_values(&["rejected"])
            .inc();
        return Err(AppError::Validation(format!(
            "scheduled order {scheduled_id} is no longer pending"
        )));
    }

    let mut order = Order::new(
        live_id,
        scheduled.customer_id,
        scheduled.restaurant_id,
        scheduled.items,
        scheduled.delivery_fee,
        scheduled.driver_tip,
    );
    order.set_stage(OrderStage::Accepted);

    // Upsert first so the order can never be lost, then delete; both steps
    // are safe to repeat.
    state.orders.insert(live_id, order.clone());
    state.scheduled_orders.remove(&scheduled_id);

    state
        .metrics
        .promotions_total
        .with_label_values(&["promoted"])
        .inc();
    state.publish_order_event(OrderEvent::from_order(&order));

    info!(scheduled_id = %scheduled_id, order_id = %live_id, "scheduled order promoted");
    Ok(order)
}

/// Marks the scheduled order rejected. The record is retained as an audit
/// trail, unlike promotion which deletes it.
pub fn reject(state: &AppState, scheduled_id: Uuid) -> Result<ScheduledOrder, AppError> {
    let mut entry = state
        .scheduled_orders
        .get_mut(&scheduled_id)
        .ok_or_else(|| AppError::NotFound(format!("scheduled order {scheduled_id} not found")))?;

    match entry.status {
        ScheduledStatus::Scheduled => {
            entry.status = ScheduledStatus::Rejected;
            state
                .metrics
                .promotions_total
                .with_label_values(&["rejected"])
                .inc();
            Ok(entry.clone())
        }
        // Re-rejecting is a no-op.
        ScheduledStatus::Rejected => Ok(entry.clone()),
        _ => Err(AppError::Validation(format!(
            "scheduled order {scheduled_id} is no longer pending"
        ))),
    }
}

/// Scheduled orders still awaiting restaurant action, soonest first.
pub fn pending_for_restaurant(state: &AppState, restaurant_id: Uuid) -> Vec<ScheduledOrder> {
    let mut pending: Vec<ScheduledOrder> = state
        .scheduled_orders
        .iter()
        .filter(|entry| entry.value().is_pending() && entry.value().restaurant_id == restaurant_id)
        .map(|entry| entry.value().clone())
        .collect();

    pending.sort_by_key(|scheduled| scheduled.scheduled_for);
    pending
}
