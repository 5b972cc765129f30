use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fine-grained lifecycle stage. The coarse `OrderStatus` is derived from
/// this via `coarse()`, so the two can never disagree about terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStage {
    Pending,
    Accepted,
    AssignedDriver,
    DriverAccepted,
    PickedUp,
    Delivered,
    Rejected,
    Cancelled,
}

/// Coarse display status: a many-to-one projection of `OrderStage`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    InProgress,
    Delivered,
    Rejected,
    Cancelled,
}

impl OrderStage {
    pub fn coarse(self) -> OrderStatus {
        match self {
            OrderStage::Pending => OrderStatus::Pending,
            OrderStage::Accepted => OrderStatus::Confirmed,
            OrderStage::AssignedDriver | OrderStage::DriverAccepted | OrderStage::PickedUp => {
                OrderStatus::InProgress
            }
            OrderStage::Delivered => OrderStatus::Delivered,
            OrderStage::Rejected => OrderStatus::Rejected,
            OrderStage::Cancelled => OrderStatus::Cancelled,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStage::Delivered | OrderStage::Rejected | OrderStage::Cancelled
        )
    }

    /// True when `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: OrderStage) -> bool {
        if next == OrderStage::Cancelled {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (OrderStage::Pending, OrderStage::Accepted)
                | (OrderStage::Pending, OrderStage::Rejected)
                | (OrderStage::Accepted, OrderStage::AssignedDriver)
                | (OrderStage::AssignedDriver, OrderStage::DriverAccepted)
                | (OrderStage::DriverAccepted, OrderStage::PickedUp)
                | (OrderStage::PickedUp, OrderStage::Delivered)
        )
    }

    /// Stages during which the order must carry a driver reference.
    pub fn requires_driver(self) -> bool {
        matches!(
            self,
            OrderStage::AssignedDriver
                | OrderStage::DriverAccepted
                | OrderStage::PickedUp
                | OrderStage::Delivered
        )
    }
}

impl std::fmt::Display for OrderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderStage::Pending => "pending",
            OrderStage::Accepted => "accepted",
            OrderStage::AssignedDriver => "assigned_driver",
            OrderStage::DriverAccepted => "driver_accepted",
            OrderStage::PickedUp => "picked_up",
            OrderStage::Delivered => "delivered",
            OrderStage::Rejected => "rejected",
            OrderStage::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub menu_item_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    #[serde(default)]
    pub customizations: Vec<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    status: OrderStatus,
    order_status: OrderStage,
    pub restaurant_id: Uuid,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub delivery_fee: f64,
    pub driver_tip: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: Uuid,
        customer_id: Uuid,
        restaurant_id: Uuid,
        items: Vec<OrderItem>,
        delivery_fee: f64,
        driver_tip: f64,
    ) -> Self {
        let subtotal: f64 = items
            .iter()
            .map(|item| item.unit_price * f64::from(item.quantity))
            .sum();
        let now = Utc::now();

        Self {
            id,
            status: OrderStatus::Pending,
            order_status: OrderStage::Pending,
            restaurant_id,
            customer_id,
            driver_id: None,
            items,
            total: subtotal + delivery_fee + driver_tip,
            delivery_fee,
            driver_tip,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stage(&self) -> OrderStage {
        self.order_status
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Single write path for both status fields. `updated_at` never moves
    /// backwards even if the wall clock does.
    pub fn set_stage(&mut self, next: OrderStage) {
        self.order_status = next;
        self.status = next.coarse();
        self.updated_at = Utc::now().max(self.updated_at);
    }

    pub fn bind_driver(&mut self, driver_id: Uuid) {
        self.driver_id = Some(driver_id);
        self.set_stage(OrderStage::AssignedDriver);
    }

    pub fn clear_driver(&mut self) {
        self.driver_id = None;
    }

    /// Amount credited to the driver on delivery.
    pub fn driver_earnings(&self) -> f64 {
        self.delivery_fee + self.driver_tip
    }
}

/// Change-feed event published after every committed order mutation.
#[derive(Debug, Clone, Serialize)]
pub struct OrderEvent {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub order_status: OrderStage,
    pub driver_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            status: order.status(),
            order_status: order.stage(),
            driver_id: order.driver_id,
            updated_at: order.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Order, OrderItem, OrderStage, OrderStatus};
    use uuid::Uuid;

    const ALL_STAGES: [OrderStage; 8] = [
        OrderStage::Pending,
        OrderStage::Accepted,
        OrderStage::AssignedDriver,
        OrderStage::DriverAccepted,
        OrderStage::PickedUp,
        OrderStage::Delivered,
        OrderStage::Rejected,
        OrderStage::Cancelled,
    ];

    #[test]
    fn coarse_projection_agrees_on_terminal_states() {
        for stage in ALL_STAGES {
            let coarse = stage.coarse();
            let coarse_terminal = matches!(
                coarse,
                OrderStatus::Delivered | OrderStatus::Rejected | OrderStatus::Cancelled
            );
            assert_eq!(stage.is_terminal(), coarse_terminal, "stage {stage}");
        }
    }

    #[test]
    fn happy_path_edges_are_legal() {
        assert!(OrderStage::Pending.can_advance_to(OrderStage::Accepted));
        assert!(OrderStage::Accepted.can_advance_to(OrderStage::AssignedDriver));
        assert!(OrderStage::AssignedDriver.can_advance_to(OrderStage::DriverAccepted));
        assert!(OrderStage::DriverAccepted.can_advance_to(OrderStage::PickedUp));
        assert!(OrderStage::PickedUp.can_advance_to(OrderStage::Delivered));
    }

    #[test]
    fn terminal_stages_admit_no_successor() {
        for terminal in [
            OrderStage::Delivered,
            OrderStage::Rejected,
            OrderStage::Cancelled,
        ] {
            for next in ALL_STAGES {
                assert!(!terminal.can_advance_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn any_non_terminal_stage_can_cancel() {
        for stage in ALL_STAGES {
            if !stage.is_terminal() {
                assert!(stage.can_advance_to(OrderStage::Cancelled), "{stage}");
            }
        }
    }

    #[test]
    fn skipping_stages_is_illegal() {
        assert!(!OrderStage::Pending.can_advance_to(OrderStage::AssignedDriver));
        assert!(!OrderStage::Accepted.can_advance_to(OrderStage::PickedUp));
        assert!(!OrderStage::AssignedDriver.can_advance_to(OrderStage::Delivered));
        // No going backwards either.
        assert!(!OrderStage::PickedUp.can_advance_to(OrderStage::DriverAccepted));
    }

    #[test]
    fn driver_is_required_exactly_from_assignment_through_delivery() {
        for stage in ALL_STAGES {
            let expected = matches!(
                stage,
                OrderStage::AssignedDriver
                    | OrderStage::DriverAccepted
                    | OrderStage::PickedUp
                    | OrderStage::Delivered
            );
            assert_eq!(stage.requires_driver(), expected, "{stage}");
        }
    }

    #[test]
    fn set_stage_keeps_both_fields_in_lockstep() {
        let mut order = Order::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Vec::new(),
            3.99,
            0.0,
        );
        assert_eq!(order.status(), OrderStatus::Pending);

        order.set_stage(OrderStage::Accepted);
        assert_eq!(order.status(), OrderStatus::Confirmed);

        order.set_stage(OrderStage::Cancelled);
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.stage().coarse(), order.status());
    }

    #[test]
    fn total_includes_items_fee_and_tip() {
        let items = vec![
            OrderItem {
                menu_item_id: Uuid::new_v4(),
                name: "Pad Thai".to_string(),
                quantity: 2,
                unit_price: 11.50,
                customizations: vec!["extra spicy".to_string()],
                special_instructions: None,
            },
            OrderItem {
                menu_item_id: Uuid::new_v4(),
                name: "Spring Rolls".to_string(),
                quantity: 1,
                unit_price: 4.00,
                customizations: Vec::new(),
                special_instructions: None,
            },
        ];

        let order = Order::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            items,
            3.99,
            2.00,
        );
        assert!((order.total - 32.99).abs() < 1e-9);
        assert!((order.driver_earnings() - 5.99).abs() < 1e-9);
    }
}
