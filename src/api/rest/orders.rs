use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::{dispatch, lifecycle};
use crate::error::AppError;
use crate::models::order::{Order, OrderItem, OrderStage};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/accept", post(accept_order))
        .route("/orders/:id/reject", post(reject_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/assign", post(assign_driver))
        .route("/orders/:id/advance", post(advance_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub restaurant_id: Uuid,
    pub items: Vec<OrderItem>,
    pub delivery_fee: f64,
    #[serde(default)]
    pub driver_tip: f64,
}

#[derive(Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: Uuid,
}

#[derive(Deserialize)]
pub struct AdvanceOrderRequest {
    pub expected_stage: OrderStage,
    pub next_stage: OrderStage,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.items.is_empty() {
        return Err(AppError::Validation("order must contain items".to_string()));
    }
    if payload.delivery_fee < 0.0 || payload.driver_tip < 0.0 {
        return Err(AppError::Validation(
            "fee and tip must be non-negative".to_string(),
        ));
    }
    if payload
        .items
        .iter()
        .any(|item| item.quantity == 0 || item.unit_price < 0.0)
    {
        return Err(AppError::Validation(
            "items need a positive quantity and a non-negative price".to_string(),
        ));
    }

    let order = Order::new(
        Uuid::new_v4(),
        payload.customer_id,
        payload.restaurant_id,
        payload.items,
        payload.delivery_fee,
        payload.driver_tip,
    );

    state.orders.insert(order.id, order.clone());
    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order.value().clone()))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    lifecycle::accept(&state, id).map(Json)
}

async fn reject_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    lifecycle::reject(&state, id).map(Json)
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    lifecycle::cancel(&state, id).map(Json)
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignDriverRequest>,
) -> Result<Json<Order>, AppError> {
    dispatch::assign(&state, id, payload.driver_id).map(Json)
}

async fn advance_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceOrderRequest>,
) -> Result<Json<Order>, AppError> {
    lifecycle::transition(&state, id, payload.expected_stage, payload.next_stage).map(Json)
}
