use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{Order, OrderEvent, OrderStage};
use crate::state::AppState;

/// Applies `expected -> next` to an order. The expected-state guard is
/// checked inside the order's entry lock, so a stale caller loses cleanly
/// with `InvalidTransition` and no record is touched.
pub fn transition(
    state: &AppState,
    order_id: Uuid,
    expected: OrderStage,
    next: OrderStage,
) -> Result<Order, AppError> {
    // Binding a driver also mutates the driver record; that path is owned
    // by dispatch::assign.
    if next == OrderStage::AssignedDriver {
        return Err(AppError::Validation(
            "driver assignment must go through dispatch".to_string(),
        ));
    }

    let (order, released_driver) = {
        let mut entry = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        let current = entry.stage();
        if current != expected || !current.can_advance_to(next) {
            state
                .metrics
                .transitions_total
                .with_label_values(&["rejected"])
                .inc();
            return Err(AppError::InvalidTransition {
                current,
                requested: next,
            });
        }

        let mut released = None;
        if matches!(next, OrderStage::Cancelled | OrderStage::Rejected) {
            released = entry.driver_id;
            entry.clear_driver();
        }
        entry.set_stage(next);
        if next == OrderStage::Delivered {
            released = entry.driver_id;
        }

        (entry.clone(), released)
    };

    // Driver side effects run after the order entry lock is dropped; the
    // order commit above is the point of no return.
    if let Some(driver_id) = released_driver {
        let credit = (next == OrderStage::Delivered).then(|| order.driver_earnings());
        release_driver(state, driver_id, credit);
    }

    state
        .metrics
        .transitions_total
        .with_label_values(&["applied"])
        .inc();
    state.publish_order_event(OrderEvent::from_order(&order));

    info!(order_id = %order.id, stage = %next, "order stage advanced");
    Ok(order)
}

/// Cancels from whatever non-terminal stage the order is currently in.
pub fn cancel(state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
    let (order, released_driver) = {
        let mut entry = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        let current = entry.stage();
        if current.is_terminal() {
            state
                .metrics
                .transitions_total
                .with_label_values(&["rejected"])
                .inc();
            return Err(AppError::InvalidTransition {
                current,
                requested: OrderStage::Cancelled,
            });
        }

        let released = entry.driver_id;
        entry.clear_driver();
        entry.set_stage(OrderStage::Cancelled);
        (entry.clone(), released)
    };

    if let Some(driver_id) = released_driver {
        release_driver(state, driver_id, None);
    }

    state
        .metrics
        .transitions_total
        .with_label_values(&["applied"])
        .inc();
    state.publish_order_event(OrderEvent::from_order(&order));

    info!(order_id = %order.id, "order cancelled");
    Ok(order)
}

pub fn accept(state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
    transition(state, order_id, OrderStage::Pending, OrderStage::Accepted)
}

pub fn reject(state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
    transition(state, order_id, OrderStage::Pending, OrderStage::Rejected)
}

/// Puts a driver back in the dispatch pool, crediting earnings first when
/// the release came from a delivery.
fn release_driver(state: &AppState, driver_id: Uuid, credit: Option<f64>) {
    let Some(mut driver) = state.drivers.get_mut(&driver_id) else {
        warn!(driver_id = %driver_id, "driver missing during release");
        return;
    };

    if let Some(amount) = credit {
        driver.credit_delivery(amount);
    }
    if !driver.is_available {
        driver.release();
        state.metrics.drivers_available.inc();
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{accept, cancel, transition};
    use crate::engine::dispatch;
    use crate::error::AppError;
    use crate::models::driver::Driver;
    use crate::models::order::{Order, OrderStage, OrderStatus};
    use crate::state::AppState;

    fn state_with_order(fee: f64, tip: f64) -> (AppState, Uuid) {
        let state = AppState::new(64);
        let order = Order::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Vec::new(),
            fee,
            tip,
        );
        let id = order.id;
        state.orders.insert(id, order);
        (state, id)
    }

    fn add_driver(state: &AppState) -> Uuid {
        let driver = Driver::new("Dana".to_string(), "+49151".to_string(), 4.8);
        let id = driver.id;
        state.drivers.insert(id, driver);
        id
    }

    #[test]
    fn stale_expected_stage_is_rejected_and_leaves_state_unchanged() {
        let (state, order_id) = state_with_order(3.99, 0.0);
        accept(&state, order_id).unwrap();

        // Caller still believes the order is pending.
        let err = transition(&state, order_id, OrderStage::Pending, OrderStage::Rejected)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition {
                current: OrderStage::Accepted,
                ..
            }
        ));
        assert_eq!(state.orders.get(&order_id).unwrap().stage(), OrderStage::Accepted);
    }

    #[test]
    fn illegal_edge_is_rejected() {
        let (state, order_id) = state_with_order(3.99, 0.0);
        let err = transition(&state, order_id, OrderStage::Pending, OrderStage::PickedUp)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert_eq!(state.orders.get(&order_id).unwrap().stage(), OrderStage::Pending);
    }

    #[test]
    fn delivery_credits_and_releases_the_driver() {
        let (state, order_id) = state_with_order(3.99, 0.0);
        let driver_id = add_driver(&state);

        accept(&state, order_id).unwrap();
        dispatch::assign(&state, order_id, driver_id).unwrap();
        transition(&state, order_id, OrderStage::AssignedDriver, OrderStage::DriverAccepted)
            .unwrap();
        transition(&state, order_id, OrderStage::DriverAccepted, OrderStage::PickedUp).unwrap();
        let order =
            transition(&state, order_id, OrderStage::PickedUp, OrderStage::Delivered).unwrap();

        assert_eq!(order.stage(), OrderStage::Delivered);
        assert_eq!(order.status(), OrderStatus::Delivered);

        let driver = state.drivers.get(&driver_id).unwrap();
        assert!(driver.is_available);
        assert!(driver.current_order_id.is_none());
        assert_eq!(driver.total_deliveries, 1);
        assert!((driver.earnings - 3.99).abs() < 1e-9);
    }

    #[test]
    fn cancel_mid_flight_releases_driver_and_clears_reference() {
        let (state, order_id) = state_with_order(2.50, 1.00);
        let driver_id = add_driver(&state);

        accept(&state, order_id).unwrap();
        dispatch::assign(&state, order_id, driver_id).unwrap();

        let order = cancel(&state, order_id).unwrap();
        assert_eq!(order.stage(), OrderStage::Cancelled);
        assert!(order.driver_id.is_none());

        let driver = state.drivers.get(&driver_id).unwrap();
        assert!(driver.is_available);
        assert!(driver.current_order_id.is_none());
        // No earnings for a cancelled run.
        assert_eq!(driver.total_deliveries, 0);
    }

    #[test]
    fn cancel_after_terminal_stage_fails() {
        let (state, order_id) = state_with_order(3.99, 0.0);
        accept(&state, order_id).unwrap();
        cancel(&state, order_id).unwrap();

        let err = cancel(&state, order_id).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn direct_assignment_through_transition_is_refused() {
        let (state, order_id) = state_with_order(3.99, 0.0);
        accept(&state, order_id).unwrap();

        let err = transition(
            &state,
            order_id,
            OrderStage::Accepted,
            OrderStage::AssignedDriver,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
