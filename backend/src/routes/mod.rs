//! Route definitions for the Warehouse Trade Management backend

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Stock receiving and acceptance
        .nest("/stock", stock_routes())
        // Warehouse-scoped stock views
        .nest("/warehouses", warehouse_routes())
        // Product availability
        .route(
            "/products/:product_id/availability",
            get(handlers::get_availability),
        )
        // Priced catalog (read-only; pricing source for order creation)
        .route("/catalog", get(handlers::list_catalog))
        // Orders and their lifecycle
        .nest("/orders", order_routes())
        // Client management
        .nest("/clients", client_routes())
}

/// Stock receiving routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::receive_stock))
        .route("/pending", post(handlers::add_pending_entries))
        .route("/entries/:entry_id/accept", post(handlers::accept_entry))
}

/// Warehouse-scoped listing routes
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_warehouses))
        .route("/:warehouse_id/products", get(handlers::list_products))
        .route("/:warehouse_id/entries", get(handlers::list_entries))
}

/// Order lifecycle routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_order))
        .route("/sweep-overdue", post(handlers::run_overdue_sweep))
        .route("/:order_id", delete(handlers::delete_order))
        .route("/:order_id/confirm", post(handlers::confirm_order))
        .route("/:order_id/payment", post(handlers::record_payment))
        .route("/:order_id/sales", get(handlers::get_order_sales))
}

/// Client management routes
fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_clients).post(handlers::create_client))
        .route(
            "/:client_id",
            get(handlers::get_client)
                .put(handlers::update_client)
                .delete(handlers::delete_client),
        )
        .route("/:client_id/orders", get(handlers::get_client_active_orders))
}
