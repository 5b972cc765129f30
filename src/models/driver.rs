use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery driver. Invariant: `is_available == false` exactly when
/// `current_order_id` is set; both flip together through `claim`/`release`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub rating: f64,
    pub total_deliveries: u32,
    pub earnings: f64,
    pub is_available: bool,
    pub current_order_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    pub fn new(name: String, phone: String, rating: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            phone,
            rating: rating.clamp(0.0, 5.0),
            total_deliveries: 0,
            earnings: 0.0,
            is_available: true,
            current_order_id: None,
            updated_at: Utc::now(),
        }
    }

    pub fn claim(&mut self, order_id: Uuid) {
        self.is_available = false;
        self.current_order_id = Some(order_id);
        self.updated_at = Utc::now();
    }

    pub fn release(&mut self) {
        self.is_available = true;
        self.current_order_id = None;
        self.updated_at = Utc::now();
    }

    /// Called once per completed delivery.
    pub fn credit_delivery(&mut self, amount: f64) {
        self.earnings += amount;
        self.total_deliveries += 1;
        self.updated_at = Utc::now();
    }
}
