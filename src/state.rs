use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::chat::{ChatEvent, ChatThread, ThreadId};
use crate::models::driver::Driver;
use crate::models::order::{Order, OrderEvent};
use crate::models::scheduled::ScheduledOrder;
use crate::observability::metrics::Metrics;

/// Shared document store plus its change feeds. DashMap entry locks are the
/// store's conditional-write primitive: every compare-and-set in the engine
/// runs inside a single `get_mut`/`entry` scope, and no entry lock is ever
/// held across an await or a second entry lookup.
pub struct AppState {
    pub orders: DashMap<Uuid, Order>,
    pub drivers: DashMap<Uuid, Driver>,
    pub scheduled_orders: DashMap<Uuid, ScheduledOrder>,
    pub chat_threads: DashMap<ThreadId, ChatThread>,
    pub order_events_tx: broadcast::Sender<OrderEvent>,
    pub chat_events_tx: broadcast::Sender<ChatEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (order_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let (chat_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            orders: DashMap::new(),
            drivers: DashMap::new(),
            scheduled_orders: DashMap::new(),
            chat_threads: DashMap::new(),
            order_events_tx,
            chat_events_tx,
            metrics: Metrics::new(),
        }
    }

    /// Subscribers may lag and miss events; the broadcast feed is a change
    /// notification, not the source of truth, so a send with no receivers
    /// is fine.
    pub fn publish_order_event(&self, event: OrderEvent) {
        let _ = self.order_events_tx.send(event);
    }

    pub fn publish_chat_event(&self, event: ChatEvent) {
        let _ = self.chat_events_tx.send(event);
    }
}
