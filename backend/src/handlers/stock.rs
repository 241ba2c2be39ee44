//! HTTP handlers for stock management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::stock::{
    AcceptEntryInput, AddPendingInput, ProductAvailability, ReceiveStockInput, ReceivedStock,
    StockEntryListing, StockService,
};
use crate::AppState;
use crate::models::{CatalogSku, ProductListing, StockEntry, Warehouse};
use shared::types::EntryStatus;

/// Receive stock into a warehouse
pub async fn receive_stock(
    State(state): State<AppState>,
    Json(input): Json<ReceiveStockInput>,
) -> AppResult<Json<ReceivedStock>> {
    let service = StockService::new(state.db);
    let received = service.receive_stock(input).await?;
    Ok(Json(received))
}

/// Register pending stock entries
pub async fn add_pending_entries(
    State(state): State<AppState>,
    Json(input): Json<AddPendingInput>,
) -> AppResult<Json<Vec<StockEntry>>> {
    let service = StockService::new(state.db);
    let entries = service.add_pending_entries(input).await?;
    Ok(Json(entries))
}

/// Accept a pending stock entry
pub async fn accept_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(input): Json<AcceptEntryInput>,
) -> AppResult<Json<StockEntry>> {
    let service = StockService::new(state.db);
    let entry = service.accept_entry(entry_id, input).await?;
    Ok(Json(entry))
}

/// Get the sellable quantity of a product
pub async fn get_availability(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductAvailability>> {
    let service = StockService::new(state.db);
    let availability = service.available_quantity(product_id).await?;
    Ok(Json(availability))
}

/// List a warehouse's products with catalog details
pub async fn list_products(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Vec<ProductListing>>> {
    let service = StockService::new(state.db);
    let products = service.list_products(warehouse_id).await?;
    Ok(Json(products))
}

/// List all warehouses
pub async fn list_warehouses(State(state): State<AppState>) -> AppResult<Json<Vec<Warehouse>>> {
    let service = StockService::new(state.db);
    let warehouses = service.list_warehouses().await?;
    Ok(Json(warehouses))
}

/// List the priced catalog
pub async fn list_catalog(State(state): State<AppState>) -> AppResult<Json<Vec<CatalogSku>>> {
    let service = StockService::new(state.db);
    let catalog = service.list_catalog().await?;
    Ok(Json(catalog))
}

/// Query parameters for entry listing
#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    pub status: Option<EntryStatus>,
}

/// List a warehouse's stock entries
pub async fn list_entries(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
    Query(query): Query<ListEntriesQuery>,
) -> AppResult<Json<Vec<StockEntryListing>>> {
    let service = StockService::new(state.db);
    let entries = service.list_entries(warehouse_id, query.status).await?;
    Ok(Json(entries))
}
