//! HTTP handlers for client management endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::client::{ClientActiveOrders, CreateClientInput, UpdateClientInput};
use crate::services::ClientService;
use crate::AppState;
use crate::models::{Client, ClientDebtSummary};

/// Query parameters for client listing
#[derive(Debug, Deserialize)]
pub struct ListClientsQuery {
    pub search: Option<String>,
}

/// List clients with debt summaries
pub async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ListClientsQuery>,
) -> AppResult<Json<Vec<ClientDebtSummary>>> {
    let service = ClientService::new(state.db);
    let clients = service.list_with_debt(query.search.as_deref()).await?;
    Ok(Json(clients))
}

/// Create a client
pub async fn create_client(
    State(state): State<AppState>,
    Json(input): Json<CreateClientInput>,
) -> AppResult<Json<Client>> {
    let service = ClientService::new(state.db);
    let client = service.create(input).await?;
    Ok(Json(client))
}

/// Get a client by ID
pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Client>> {
    let service = ClientService::new(state.db);
    let client = service.get(client_id).await?;
    Ok(Json(client))
}

/// Update a client
pub async fn update_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    Json(input): Json<UpdateClientInput>,
) -> AppResult<Json<Client>> {
    let service = ClientService::new(state.db);
    let client = service.update(client_id, input).await?;
    Ok(Json(client))
}

/// Delete a client
pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let service = ClientService::new(state.db);
    service.delete(client_id).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// A client's active orders
pub async fn get_client_active_orders(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<ClientActiveOrders>> {
    let service = ClientService::new(state.db);
    let orders = service.active_orders(client_id).await?;
    Ok(Json(orders))
}
