//! Stock ledger service for receiving stock and tracking lot capacity
//!
//! The ledger invariant: a product's aggregate `quantity` always equals the
//! sum of `(quantity - sold_quantity)` over its accepted stock entries.
//! Receiving and acceptance increment both sides in one transaction; only
//! the allocation engine decrements them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CatalogSku, Product, ProductListing, StockEntry, Warehouse};
use shared::types::EntryStatus;

use super::parse_entry_status;

/// Stock service for receiving, accepting and inspecting stock lots
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Input for receiving stock into a warehouse
#[derive(Debug, Deserialize)]
pub struct ReceiveStockInput {
    pub warehouse_id: Uuid,
    pub sku_id: Uuid,
    pub quantity: i64,
    pub purchase_price: Decimal,
}

/// One pending entry to register for later acceptance
#[derive(Debug, Deserialize)]
pub struct PendingEntryInput {
    pub product_id: Uuid,
    pub quantity: i64,
    pub purchase_price: Decimal,
}

/// Input for registering pending entries
#[derive(Debug, Deserialize)]
pub struct AddPendingInput {
    pub warehouse_id: Uuid,
    pub entries: Vec<PendingEntryInput>,
}

/// Input for accepting a pending entry
#[derive(Debug, Deserialize)]
pub struct AcceptEntryInput {
    pub accepted_by: Uuid,
}

/// Result of receiving stock: the (possibly new) product row and the lot
#[derive(Debug, Serialize)]
pub struct ReceivedStock {
    pub product: Product,
    pub entry: StockEntry,
}

/// Sellable quantity of one product
#[derive(Debug, Serialize)]
pub struct ProductAvailability {
    pub product_id: Uuid,
    pub available: i64,
}

/// Stock entry joined with its catalog names, for warehouse listings
#[derive(Debug, Serialize)]
pub struct StockEntryListing {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub sold_quantity: i64,
    pub status: EntryStatus,
    pub entry_date: DateTime<Utc>,
    pub purchase_price: Decimal,
    pub item_name: String,
    pub brand_name: String,
    pub model_name: String,
}

/// Row for product queries
#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    warehouse_id: Uuid,
    sku_id: Uuid,
    quantity: i64,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            warehouse_id: row.warehouse_id,
            sku_id: row.sku_id,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

/// Row for stock entry queries
#[derive(Debug, FromRow)]
pub(crate) struct StockEntryRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i64,
    pub sold_quantity: i64,
    pub sold_out: bool,
    pub status: String,
    pub entry_date: DateTime<Utc>,
    pub purchase_price: Decimal,
    pub accepted_by: Option<Uuid>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl StockEntryRow {
    pub(crate) fn into_model(self) -> AppResult<StockEntry> {
        Ok(StockEntry {
            id: self.id,
            product_id: self.product_id,
            warehouse_id: self.warehouse_id,
            quantity: self.quantity,
            sold_quantity: self.sold_quantity,
            sold_out: self.sold_out,
            status: parse_entry_status(&self.status)?,
            entry_date: self.entry_date,
            purchase_price: self.purchase_price,
            accepted_by: self.accepted_by,
            accepted_at: self.accepted_at,
            created_at: self.created_at,
        })
    }
}

const ENTRY_COLUMNS: &str = "id, product_id, warehouse_id, quantity, sold_quantity, sold_out, \
     status, entry_date, purchase_price, accepted_by, accepted_at, created_at";

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Receive stock: upsert the product counter for (warehouse, sku) and
    /// record the lot as an accepted entry, in one transaction.
    pub async fn receive_stock(&self, input: ReceiveStockInput) -> AppResult<ReceivedStock> {
        if input.quantity <= 0 {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be positive".to_string(),
            });
        }
        if input.purchase_price < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "purchase_price".to_string(),
                message: "Purchase price cannot be negative".to_string(),
            });
        }

        let warehouse_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)",
        )
        .bind(input.warehouse_id)
        .fetch_one(&self.db)
        .await?;

        if !warehouse_exists {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        let sku_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM catalog_skus WHERE id = $1)")
                .bind(input.sku_id)
                .fetch_one(&self.db)
                .await?;

        if !sku_exists {
            return Err(AppError::NotFound("Catalog SKU".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let product = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (warehouse_id, sku_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (warehouse_id, sku_id)
                DO UPDATE SET quantity = products.quantity + EXCLUDED.quantity
            RETURNING id, warehouse_id, sku_id, quantity, created_at
            "#,
        )
        .bind(input.warehouse_id)
        .bind(input.sku_id)
        .bind(input.quantity)
        .fetch_one(&mut *tx)
        .await?;

        let entry = sqlx::query_as::<_, StockEntryRow>(&format!(
            r#"
            INSERT INTO stock_entries (product_id, warehouse_id, quantity, purchase_price, status)
            VALUES ($1, $2, $3, $4, 'done')
            RETURNING {}
            "#,
            ENTRY_COLUMNS
        ))
        .bind(product.id)
        .bind(input.warehouse_id)
        .bind(input.quantity)
        .bind(input.purchase_price)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %product.id,
            entry_id = %entry.id,
            quantity = input.quantity,
            "stock received"
        );

        Ok(ReceivedStock {
            product: product.into(),
            entry: entry.into_model()?,
        })
    }

    /// Register pending entries awaiting acceptance. Pending lots do not
    /// count toward sellable stock. Entries referencing unknown products are
    /// skipped with a warning, matching intake from external suppliers where
    /// a line may reference a product another warehouse owns.
    pub async fn add_pending_entries(&self, input: AddPendingInput) -> AppResult<Vec<StockEntry>> {
        let mut created = Vec::new();

        for pending in &input.entries {
            if pending.quantity <= 0 {
                return Err(AppError::Validation {
                    field: "quantity".to_string(),
                    message: "Quantity must be positive".to_string(),
                });
            }

            let product_exists =
                sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                    .bind(pending.product_id)
                    .fetch_one(&self.db)
                    .await?;

            if !product_exists {
                tracing::warn!(product_id = %pending.product_id, "skipping pending entry for unknown product");
                continue;
            }

            let entry = sqlx::query_as::<_, StockEntryRow>(&format!(
                r#"
                INSERT INTO stock_entries (product_id, warehouse_id, quantity, purchase_price, status)
                VALUES ($1, $2, $3, $4, 'pending')
                RETURNING {}
                "#,
                ENTRY_COLUMNS
            ))
            .bind(pending.product_id)
            .bind(input.warehouse_id)
            .bind(pending.quantity)
            .bind(pending.purchase_price)
            .fetch_one(&self.db)
            .await?;

            created.push(entry.into_model()?);
        }

        Ok(created)
    }

    /// Accept a pending entry: the lot becomes sellable, so the product
    /// counter and the entry flip together in one transaction.
    pub async fn accept_entry(&self, entry_id: Uuid, input: AcceptEntryInput) -> AppResult<StockEntry> {
        let mut tx = self.db.begin().await?;

        let entry = sqlx::query_as::<_, StockEntryRow>(&format!(
            "SELECT {} FROM stock_entries WHERE id = $1 FOR UPDATE",
            ENTRY_COLUMNS
        ))
        .bind(entry_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock entry".to_string()))?;

        if entry.status == EntryStatus::Done.as_str() {
            return Err(AppError::Validation {
                field: "entry_id".to_string(),
                message: "Stock entry is already accepted".to_string(),
            });
        }

        sqlx::query("UPDATE products SET quantity = quantity + $1 WHERE id = $2")
            .bind(entry.quantity)
            .bind(entry.product_id)
            .execute(&mut *tx)
            .await?;

        let accepted = sqlx::query_as::<_, StockEntryRow>(&format!(
            r#"
            UPDATE stock_entries
            SET status = 'done', accepted_by = $2, accepted_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ENTRY_COLUMNS
        ))
        .bind(entry_id)
        .bind(input.accepted_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(entry_id = %entry_id, accepted_by = %input.accepted_by, "stock entry accepted");

        accepted.into_model()
    }

    /// Sellable quantity of a product: the sum of unconsumed capacity over
    /// its accepted lots. Divergence from the aggregate counter means some
    /// writer bypassed the allocation path; that is surfaced, never patched.
    pub async fn available_quantity(&self, product_id: Uuid) -> AppResult<ProductAvailability> {
        let aggregate = sqlx::query_scalar::<_, i64>("SELECT quantity FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let lot_sum = sqlx::query_scalar::<_, Option<i64>>(
            r#"
            SELECT SUM(quantity - sold_quantity)::BIGINT
            FROM stock_entries
            WHERE product_id = $1 AND status = 'done'
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?
        .unwrap_or(0);

        if lot_sum != aggregate {
            tracing::error!(
                product_id = %product_id,
                aggregate,
                lot_sum,
                "ledger invariant violated"
            );
            return Err(AppError::IntegrityViolation(format!(
                "product {} aggregate quantity {} diverges from lot sum {}",
                product_id, aggregate, lot_sum
            )));
        }

        Ok(ProductAvailability {
            product_id,
            available: lot_sum,
        })
    }

    /// Open lots of a product, oldest first. Ties on entry date resolve in
    /// insertion order so FIFO consumption is deterministic.
    pub async fn open_lots(&self, product_id: Uuid) -> AppResult<Vec<StockEntry>> {
        let rows = sqlx::query_as::<_, StockEntryRow>(&format!(
            r#"
            SELECT {}
            FROM stock_entries
            WHERE product_id = $1 AND status = 'done' AND sold_out = FALSE
            ORDER BY entry_date ASC, seq ASC
            "#,
            ENTRY_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockEntryRow::into_model).collect()
    }

    /// List a warehouse's products with their catalog columns
    pub async fn list_products(&self, warehouse_id: Uuid) -> AppResult<Vec<ProductListing>> {
        let warehouse_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)",
        )
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        if !warehouse_exists {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        let rows = sqlx::query_as::<_, ProductListingRow>(
            r#"
            SELECT p.id, p.warehouse_id, p.sku_id, p.quantity, p.created_at,
                   s.item_name, s.brand_name, s.model_name, s.retail_price, s.wholesale_price
            FROM products p
            JOIN catalog_skus s ON s.id = p.sku_id
            WHERE p.warehouse_id = $1
            ORDER BY s.item_name, s.brand_name, s.model_name
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ProductListingRow::into_listing).collect())
    }

    /// List all warehouses
    pub async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, WarehouseRow>(
            "SELECT id, name, location, created_at FROM warehouses ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(warehouses.into_iter().map(WarehouseRow::into_model).collect())
    }

    /// List the priced catalog, the source order pricing reads from
    pub async fn list_catalog(&self) -> AppResult<Vec<CatalogSku>> {
        let skus = sqlx::query_as::<_, CatalogSkuRow>(
            r#"
            SELECT id, item_name, brand_name, model_name, retail_price, wholesale_price, created_at
            FROM catalog_skus
            ORDER BY item_name, brand_name, model_name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(skus.into_iter().map(CatalogSkuRow::into_model).collect())
    }

    /// List a warehouse's stock entries, filtered by status (default: done)
    pub async fn list_entries(
        &self,
        warehouse_id: Uuid,
        status: Option<EntryStatus>,
    ) -> AppResult<Vec<StockEntryListing>> {
        let status = status.unwrap_or(EntryStatus::Done);

        let rows = sqlx::query_as::<_, StockEntryListingRow>(
            r#"
            SELECT e.id, e.product_id, e.quantity, e.sold_quantity, e.status,
                   e.entry_date, e.purchase_price,
                   s.item_name, s.brand_name, s.model_name
            FROM stock_entries e
            JOIN products p ON p.id = e.product_id
            JOIN catalog_skus s ON s.id = p.sku_id
            WHERE e.warehouse_id = $1 AND e.status = $2
            ORDER BY e.entry_date DESC, e.seq DESC
            "#,
        )
        .bind(warehouse_id)
        .bind(status.as_str())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(StockEntryListing {
                    id: row.id,
                    product_id: row.product_id,
                    quantity: row.quantity,
                    sold_quantity: row.sold_quantity,
                    status: parse_entry_status(&row.status)?,
                    entry_date: row.entry_date,
                    purchase_price: row.purchase_price,
                    item_name: row.item_name,
                    brand_name: row.brand_name,
                    model_name: row.model_name,
                })
            })
            .collect()
    }
}

/// Row for product listing query
#[derive(Debug, FromRow)]
struct ProductListingRow {
    id: Uuid,
    warehouse_id: Uuid,
    sku_id: Uuid,
    quantity: i64,
    created_at: DateTime<Utc>,
    item_name: String,
    brand_name: String,
    model_name: String,
    retail_price: Decimal,
    wholesale_price: Decimal,
}

impl ProductListingRow {
    fn into_listing(self) -> ProductListing {
        ProductListing {
            id: self.id,
            warehouse_id: self.warehouse_id,
            sku_id: self.sku_id,
            quantity: self.quantity,
            item_name: self.item_name,
            brand_name: self.brand_name,
            model_name: self.model_name,
            retail_price: self.retail_price,
            wholesale_price: self.wholesale_price,
            created_at: self.created_at,
        }
    }
}

/// Row for warehouse queries
#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    name: String,
    location: Option<String>,
    created_at: DateTime<Utc>,
}

impl WarehouseRow {
    fn into_model(self) -> Warehouse {
        Warehouse {
            id: self.id,
            name: self.name,
            location: self.location,
            created_at: self.created_at,
        }
    }
}

/// Row for catalog queries
#[derive(Debug, FromRow)]
struct CatalogSkuRow {
    id: Uuid,
    item_name: String,
    brand_name: String,
    model_name: String,
    retail_price: Decimal,
    wholesale_price: Decimal,
    created_at: DateTime<Utc>,
}

impl CatalogSkuRow {
    fn into_model(self) -> CatalogSku {
        CatalogSku {
            id: self.id,
            item_name: self.item_name,
            brand_name: self.brand_name,
            model_name: self.model_name,
            retail_price: self.retail_price,
            wholesale_price: self.wholesale_price,
            created_at: self.created_at,
        }
    }
}

/// Row for entry listing query
#[derive(Debug, FromRow)]
struct StockEntryListingRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i64,
    sold_quantity: i64,
    status: String,
    entry_date: DateTime<Utc>,
    purchase_price: Decimal,
    item_name: String,
    brand_name: String,
    model_name: String,
}
