//! Product and catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A priced catalog entry for one item/brand/model combination.
///
/// Catalog management (naming, search) lives outside this system; the entry
/// exists here because order pricing reads its retail/wholesale columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSku {
    pub id: Uuid,
    pub item_name: String,
    pub brand_name: String,
    pub model_name: String,
    pub retail_price: Decimal,
    pub wholesale_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Aggregate per-warehouse stock counter for one SKU.
///
/// `quantity` is the currently sellable total and must always equal the sum
/// of unconsumed capacity over the product's accepted stock entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub sku_id: Uuid,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// Product joined with its catalog columns, as listed per warehouse
#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub sku_id: Uuid,
    pub quantity: i64,
    pub item_name: String,
    pub brand_name: String,
    pub model_name: String,
    pub retail_price: Decimal,
    pub wholesale_price: Decimal,
    pub created_at: DateTime<Utc>,
}
