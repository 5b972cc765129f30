use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::promotion;
use crate::error::AppError;
use crate::models::order::{Order, OrderItem};
use crate::models::scheduled::ScheduledOrder;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scheduled", post(create_scheduled))
        .route("/scheduled/:id/promote", post(promote_scheduled))
        .route("/scheduled/:id/reject", post(reject_scheduled))
        .route("/restaurants/:id/scheduled", get(pending_scheduled))
}

#[derive(Deserialize)]
pub struct CreateScheduledRequest {
    pub customer_id: Uuid,
    pub restaurant_id: Uuid,
    pub items: Vec<OrderItem>,
    pub delivery_fee: f64,
    #[serde(default)]
    pub driver_tip: f64,
    pub scheduled_for: DateTime<Utc>,
}

async fn create_scheduled(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateScheduledRequest>,
) -> Result<Json<ScheduledOrder>, AppError> {
    if payload.items.is_empty() {
        return Err(AppError::Validation("order must contain items".to_string()));
    }
    if payload.scheduled_for <= Utc::now() {
        return Err(AppError::Validation(
            "scheduled_for must be in the future".to_string(),
        ));
    }

    let scheduled = ScheduledOrder::new(
        payload.customer_id,
        payload.restaurant_id,
        payload.items,
        payload.delivery_fee,
        payload.driver_tip,
        payload.scheduled_for,
    );

    state.scheduled_orders.insert(scheduled.id, scheduled.clone());
    Ok(Json(scheduled))
}

async fn promote_scheduled(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    promotion::promote(&state, id).map(Json)
}

async fn reject_scheduled(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduledOrder>, AppError> {
    promotion::reject(&state, id).map(Json)
}

async fn pending_scheduled(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Json<Vec<ScheduledOrder>> {
    Json(promotion::pending_for_restaurant(&state, id))
}
