//! HTTP handlers for client order endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::order::{CreateOrderInput, SweepOutcome};
use crate::services::{AllocationService, OrderService};
use crate::AppState;
use crate::models::{ClientOrder, ProductSaleListing};

/// Create a client order with its line items
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<Json<ClientOrder>> {
    let service = OrderService::new(state.db);
    let order = service.create_order(input).await?;
    Ok(Json(order))
}

/// Confirm an order, consuming stock FIFO
pub async fn confirm_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ClientOrder>> {
    let service = AllocationService::new(state.db);
    let order = service.confirm_order(order_id).await?;
    Ok(Json(order))
}

/// Settle an order in full
pub async fn record_payment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ClientOrder>> {
    let service = OrderService::new(state.db);
    let order = service.record_payment(order_id).await?;
    Ok(Json(order))
}

/// Delete an order, restoring consumed stock if it was confirmed
pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let service = OrderService::new(state.db);
    service.delete_order(order_id).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// Line items of an order
pub async fn get_order_sales(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Vec<ProductSaleListing>>> {
    let service = OrderService::new(state.db);
    let sales = service.order_sales(order_id).await?;
    Ok(Json(sales))
}

/// Trigger the overdue sweep manually
pub async fn run_overdue_sweep(State(state): State<AppState>) -> AppResult<Json<SweepOutcome>> {
    let service = OrderService::new(state.db);
    let outcome = service.sweep_overdue(Utc::now()).await?;
    Ok(Json(outcome))
}
