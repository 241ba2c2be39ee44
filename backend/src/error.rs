//! Error handling for the Warehouse Trade Management backend
//!
//! Expected business outcomes (not found, already confirmed, insufficient
//! stock, ...) are explicit variants surfaced verbatim to the caller; ledger
//! integrity faults are fatal and only ever logged for manual reconciliation.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Order {0} is already confirmed")]
    AlreadyConfirmed(Uuid),

    #[error("Order {0} is already fully paid")]
    AlreadyPaid(Uuid),

    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: Uuid,
        available: i64,
        requested: i64,
    },

    /// Concurrent confirmations collided on a lot. Retried internally a
    /// bounded number of times before it ever reaches a caller.
    #[error("Stock allocation conflicted with a concurrent confirmation")]
    AllocationRace,

    /// The aggregate product quantity disagrees with the lot ledger. Never
    /// retried and never auto-corrected.
    #[error("Ledger integrity violation: {0}")]
    IntegrityViolation(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{} not found", resource),
                    field: None,
                },
            ),
            AppError::AlreadyConfirmed(order_id) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "ALREADY_CONFIRMED".to_string(),
                    message: format!("Order {} is already confirmed", order_id),
                    field: None,
                },
            ),
            AppError::AlreadyPaid(order_id) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "ALREADY_PAID".to_string(),
                    message: format!("Order {} is already fully paid", order_id),
                    field: None,
                },
            ),
            AppError::InsufficientStock {
                product_id,
                available,
                requested,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message: format!(
                        "Insufficient stock for product {}: available {}, requested {}",
                        product_id, available, requested
                    ),
                    field: None,
                },
            ),
            AppError::AllocationRace => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "ALLOCATION_CONFLICT".to_string(),
                    message: "Order confirmation conflicted with concurrent activity, try again"
                        .to_string(),
                    field: None,
                },
            ),
            AppError::IntegrityViolation(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "LEDGER_INTEGRITY".to_string(),
                    message: detail.clone(),
                    field: None,
                },
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message: "A database error occurred".to_string(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
