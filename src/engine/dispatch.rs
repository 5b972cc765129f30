use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::Driver;
use crate::models::order::{Order, OrderEvent, OrderStage};
use crate::state::AppState;

/// Dispatchable drivers, best candidates first: rating descending, then
/// total deliveries descending. Ranking is a UI courtesy, not a contract.
pub fn list_available(state: &AppState) -> Vec<Driver> {
    let mut drivers: Vec<Driver> = state
        .drivers
        .iter()
        .filter(|entry| entry.value().is_available)
        .map(|entry| entry.value().clone())
        .collect();

    drivers.sort_by(|a, b| {
        b.rating
            .total_cmp(&a.rating)
            .then(b.total_deliveries.cmp(&a.total_deliveries))
    });
    drivers
}

/// Binds one available driver to one assignable order.
///
/// The driver claim is the compare-and-set: it happens first, inside the
/// driver's entry lock, so of N concurrent callers exactly one flips
/// `is_available` and the rest get `DriverUnavailable`. The order update
/// follows under its own lock; if the order turns out not to be assignable
/// the claim is rolled back by a compensating release. The two entry locks
/// are never held at the same time.
pub fn assign(state: &AppState, order_id: Uuid, driver_id: Uuid) -> Result<Order, AppError> {
    {
        let mut driver = state
            .drivers
            .get_mut(&driver_id)
            .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

        if !driver.is_available {
            state
                .metrics
                .assignments_total
                .with_label_values(&["driver_unavailable"])
                .inc();
            return Err(AppError::DriverUnavailable(driver_id));
        }

        driver.claim(order_id);
        state.metrics.drivers_available.dec();
    }

    let bound = bind_order(state, order_id, driver_id);

    match bound {
        Ok(order) => {
            state
                .metrics
                .assignments_total
                .with_label_values(&["assigned"])
                .inc();
            state.publish_order_event(OrderEvent::from_order(&order));
            info!(order_id = %order_id, driver_id = %driver_id, "driver assigned");
            Ok(order)
        }
        Err(err) => {
            // Compensating release: give the claim back only if it is still
            // ours, then report the original failure.
            if let Some(mut driver) = state.drivers.get_mut(&driver_id) {
                if driver.current_order_id == Some(order_id) {
                    driver.release();
                    state.metrics.drivers_available.inc();
                }
            }
            state
                .metrics
                .assignments_total
                .with_label_values(&["rejected"])
                .inc();
            warn!(order_id = %order_id, driver_id = %driver_id, error = %err, "assignment rolled back");
            Err(err)
        }
    }
}

fn bind_order(state: &AppState, order_id: Uuid, driver_id: Uuid) -> Result<Order, AppError> {
    let mut order = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    if order.stage() != OrderStage::Accepted {
        return Err(AppError::OrderNotAssignable {
            stage: order.stage(),
        });
    }

    order.bind_driver(driver_id);
    Ok(order.clone())
}
