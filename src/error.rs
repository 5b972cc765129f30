use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::order::OrderStage;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid transition: order is {current}, cannot move to {requested}")]
    InvalidTransition {
        current: OrderStage,
        requested: OrderStage,
    },

    #[error("driver {0} is not available")]
    DriverUnavailable(uuid::Uuid),

    #[error("order is {stage}, only accepted orders can be assigned")]
    OrderNotAssignable { stage: OrderStage },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable discriminator. Callers may retry
    /// `store_unavailable` with backoff; every other kind is terminal for
    /// that attempt.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::DriverUnavailable(_) => "driver_unavailable",
            AppError::OrderNotAssignable { .. } => "order_not_assignable",
            AppError::NotFound(_) => "not_found",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Validation(_) => "validation",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidTransition { .. }
            | AppError::DriverUnavailable(_)
            | AppError::OrderNotAssignable { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "kind": self.kind(),
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
