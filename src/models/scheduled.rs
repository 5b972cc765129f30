use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::OrderItem;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledStatus {
    Scheduled,
    Accepted,
    Rejected,
    Completed,
}

/// Future-dated order. On acceptance it is promoted into a live `Order` and
/// this record is deleted; on rejection it is marked and retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledOrder {
    pub id: Uuid,
    pub status: ScheduledStatus,
    pub restaurant_id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<OrderItem>,
    pub delivery_fee: f64,
    pub driver_tip: f64,
    pub scheduled_for: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledOrder {
    pub fn new(
        customer_id: Uuid,
        restaurant_id: Uuid,
        items: Vec<OrderItem>,
        delivery_fee: f64,
        driver_tip: f64,
        scheduled_for: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: ScheduledStatus::Scheduled,
            restaurant_id,
            customer_id,
            items,
            delivery_fee,
            driver_tip,
            scheduled_for,
            created_at: Utc::now(),
        }
    }

    /// Still awaiting restaurant action.
    pub fn is_pending(&self) -> bool {
        !matches!(
            self.status,
            ScheduledStatus::Accepted | ScheduledStatus::Rejected | ScheduledStatus::Completed
        )
    }
}
