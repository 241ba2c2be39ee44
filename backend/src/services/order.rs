//! Client order lifecycle service
//!
//! Owns order creation (two-phase pricing), full settlement, the overdue
//! sweep and administrative deletion. Stock consumption on confirmation
//! lives in the allocation service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::lifecycle::{self, LifecycleError};
use crate::models::{ClientOrder, ProductSaleListing};
use shared::types::{OrderKind, PaymentStatus};

use super::{parse_order_kind, parse_payment_status};

/// Order service for creation, payment and overdue bookkeeping
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

/// One requested line of a new order
#[derive(Debug, Deserialize)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i64,
}

/// Input for creating a client order
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub client_id: Uuid,
    pub warehouse_id: Uuid,
    pub kind: OrderKind,
    /// `credit` opens a balance due by `payday`; `paid` settles immediately
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub amount_paid: Decimal,
    pub payday: Option<DateTime<Utc>>,
    pub lines: Vec<OrderLineInput>,
}

/// Result of an overdue sweep run
#[derive(Debug, Serialize)]
pub struct SweepOutcome {
    pub updated: u64,
}

/// Row for client order queries
#[derive(Debug, FromRow)]
pub(crate) struct OrderRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub warehouse_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub kind: String,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub status: String,
    pub confirmed: bool,
    pub payday: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub(crate) const ORDER_COLUMNS: &str = "id, client_id, warehouse_id, order_date, kind, \
     total_amount, amount_paid, balance, status, confirmed, payday, created_at";

impl OrderRow {
    pub(crate) fn into_model(self) -> AppResult<ClientOrder> {
        Ok(ClientOrder {
            id: self.id,
            client_id: self.client_id,
            warehouse_id: self.warehouse_id,
            order_date: self.order_date,
            kind: parse_order_kind(&self.kind)?,
            total_amount: self.total_amount,
            amount_paid: self.amount_paid,
            balance: self.balance,
            status: parse_payment_status(&self.status)?,
            confirmed: self.confirmed,
            payday: self.payday,
            created_at: self.created_at,
        })
    }
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a client order with its line items.
    ///
    /// Two-phase create inside one transaction: the order and line skeletons
    /// are inserted first with zero totals, then each line is priced from
    /// the catalog (retail or wholesale column per the order kind) and the
    /// order total and opening balance are rolled up. Nothing is visible to
    /// confirmation until the transaction commits, so a partially priced
    /// order cannot be confirmed.
    pub async fn create_order(&self, input: CreateOrderInput) -> AppResult<ClientOrder> {
        self.validate_create(&input)?;

        let client_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1)")
                .bind(input.client_id)
                .fetch_one(&self.db)
                .await?;
        if !client_exists {
            return Err(AppError::NotFound("Client".to_string()));
        }

        let warehouse_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)")
                .bind(input.warehouse_id)
                .fetch_one(&self.db)
                .await?;
        if !warehouse_exists {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        let mut tx = self.db.begin().await?;

        // Phase one: skeleton rows with zero totals
        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO client_orders
                (client_id, warehouse_id, kind, status, amount_paid, payday, confirmed)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE)
            RETURNING id
            "#,
        )
        .bind(input.client_id)
        .bind(input.warehouse_id)
        .bind(input.kind.as_str())
        .bind(input.payment_status.as_str())
        .bind(input.amount_paid)
        .bind(input.payday)
        .fetch_one(&mut *tx)
        .await?;

        let mut line_ids = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            let line_id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO product_sales (order_id, product_id, warehouse_id, quantity, kind)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(input.warehouse_id)
            .bind(line.quantity)
            .bind(input.kind.as_str())
            .fetch_one(&mut *tx)
            .await?;
            line_ids.push(line_id);
        }

        // Phase two: price each line at the current catalog price, frozen
        // into the row from here on
        let mut order_total = Decimal::ZERO;
        for (line, line_id) in input.lines.iter().zip(&line_ids) {
            let prices = sqlx::query_as::<_, (Decimal, Decimal)>(
                r#"
                SELECT s.retail_price, s.wholesale_price
                FROM products p
                JOIN catalog_skus s ON s.id = p.sku_id
                WHERE p.id = $1
                "#,
            )
            .bind(line.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", line.product_id)))?;

            let unit_price = match input.kind {
                OrderKind::Retail => prices.0,
                OrderKind::Wholesale => prices.1,
            };
            let line_total = unit_price * Decimal::from(line.quantity);
            order_total += line_total;

            sqlx::query("UPDATE product_sales SET total_amount = $1 WHERE id = $2")
                .bind(line_total)
                .bind(line_id)
                .execute(&mut *tx)
                .await?;
        }

        let (amount_paid, balance) =
            lifecycle::opening_balance(input.payment_status, order_total, input.amount_paid)
                .map_err(|err| match err {
                    LifecycleError::OverPayment { paid, total } => AppError::Validation {
                        field: "amount_paid".to_string(),
                        message: format!("Amount paid {} exceeds order total {}", paid, total),
                    },
                    LifecycleError::AlreadyPaid => AppError::AlreadyPaid(order_id),
                })?;

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE client_orders
            SET total_amount = $2, amount_paid = $3, balance = $4
            WHERE id = $1
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(order_total)
        .bind(amount_paid)
        .bind(balance)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            client_id = %input.client_id,
            total = %order_total,
            "client order created"
        );

        order.into_model()
    }

    /// Settle an order in full: balance to zero, status to `paid`.
    ///
    /// The write re-checks the balance in the same statement, so a payment
    /// racing the overdue sweep always wins.
    pub async fn record_payment(&self, order_id: Uuid) -> AppResult<ClientOrder> {
        let mut tx = self.db.begin().await?;

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM client_orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let settlement = lifecycle::settle(order.total_amount, order.balance)
            .map_err(|_| AppError::AlreadyPaid(order_id))?;

        let updated = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE client_orders
            SET amount_paid = $2, balance = $3, status = $4
            WHERE id = $1 AND balance > 0
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(settlement.amount_paid)
        .bind(settlement.balance)
        .bind(settlement.status.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::AlreadyPaid(order_id))?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, amount = %settlement.amount_paid, "order settled");

        updated.into_model()
    }

    /// Transition every confirmed, unpaid order past its payday to
    /// `overdue`. One guarded statement: orders paid in the meantime fail
    /// the `amount_paid < total_amount` check and are left alone, which also
    /// makes the sweep idempotent.
    pub async fn sweep_overdue(&self, now: DateTime<Utc>) -> AppResult<SweepOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE client_orders
            SET status = 'overdue'
            WHERE confirmed = TRUE
              AND payday IS NOT NULL
              AND payday < $1
              AND amount_paid < total_amount
              AND status NOT IN ('overdue', 'paid')
            "#,
        )
        .bind(now)
        .execute(&self.db)
        .await?;

        let updated = result.rows_affected();
        tracing::info!(updated, "overdue sweep completed");

        Ok(SweepOutcome { updated })
    }

    /// Administrative deletion of an order.
    ///
    /// A confirmed order already consumed stock, so its line quantities are
    /// first returned to the ledger: each product's lots are refilled
    /// newest-first (the reverse of FIFO consumption) and the aggregate
    /// counter incremented, keeping the ledger invariant intact. Line items
    /// and the order row go last, all in one transaction.
    pub async fn delete_order(&self, order_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM client_orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let lines = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT product_id, quantity FROM product_sales WHERE order_id = $1 ORDER BY product_id",
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;

        if order.confirmed {
            // Lock the product rows in the same stable order confirmation
            // uses, then restore
            let mut product_ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();
            product_ids.sort();
            product_ids.dedup();

            sqlx::query("SELECT id FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE")
                .bind(&product_ids)
                .execute(&mut *tx)
                .await?;

            for (product_id, quantity) in &lines {
                if *quantity == 0 {
                    continue;
                }
                self.restore_to_lots(&mut tx, *product_id, *quantity).await?;

                sqlx::query("UPDATE products SET quantity = quantity + $1 WHERE id = $2")
                    .bind(quantity)
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        sqlx::query("DELETE FROM product_sales WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM client_orders WHERE id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, confirmed = order.confirmed, "order deleted");

        Ok(())
    }

    /// Return `quantity` units to a product's lots, newest first
    async fn restore_to_lots(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        product_id: Uuid,
        quantity: i64,
    ) -> AppResult<()> {
        let lots = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT id, sold_quantity
            FROM stock_entries
            WHERE product_id = $1 AND status = 'done' AND sold_quantity > 0
            ORDER BY entry_date DESC, seq DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut **tx)
        .await?;

        let mut remaining = quantity;
        for (lot_id, sold_quantity) in lots {
            if remaining == 0 {
                break;
            }
            let give_back = sold_quantity.min(remaining);

            sqlx::query(
                "UPDATE stock_entries SET sold_quantity = sold_quantity - $1, sold_out = FALSE WHERE id = $2",
            )
            .bind(give_back)
            .bind(lot_id)
            .execute(&mut **tx)
            .await?;

            remaining -= give_back;
        }

        if remaining > 0 {
            tracing::error!(
                product_id = %product_id,
                unrestored = remaining,
                "lot ledger cannot absorb restored quantity"
            );
            return Err(AppError::IntegrityViolation(format!(
                "product {} lots cannot absorb {} restored units",
                product_id, remaining
            )));
        }

        Ok(())
    }

    /// Line items of an order with their catalog names
    pub async fn order_sales(&self, order_id: Uuid) -> AppResult<Vec<ProductSaleListing>> {
        let order_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM client_orders WHERE id = $1)",
        )
        .bind(order_id)
        .fetch_one(&self.db)
        .await?;
        if !order_exists {
            return Err(AppError::NotFound("Order".to_string()));
        }

        let rows = sqlx::query_as::<_, SaleListingRow>(
            r#"
            SELECT ps.id, ps.order_id, ps.product_id, ps.quantity, ps.total_amount, ps.sale_date,
                   s.item_name, s.brand_name, s.model_name
            FROM product_sales ps
            JOIN products p ON p.id = ps.product_id
            JOIN catalog_skus s ON s.id = p.sku_id
            WHERE ps.order_id = $1
            ORDER BY ps.sale_date, ps.id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProductSaleListing {
                id: row.id,
                order_id: row.order_id,
                product_id: row.product_id,
                quantity: row.quantity,
                total_amount: row.total_amount,
                sale_date: row.sale_date,
                item_name: row.item_name,
                brand_name: row.brand_name,
                model_name: row.model_name,
            })
            .collect())
    }

    fn validate_create(&self, input: &CreateOrderInput) -> AppResult<()> {
        if input.lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "An order needs at least one line item".to_string(),
            });
        }
        for line in &input.lines {
            if line.quantity < 0 {
                return Err(AppError::Validation {
                    field: "lines".to_string(),
                    message: "Line quantity cannot be negative".to_string(),
                });
            }
        }
        if input.amount_paid < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "amount_paid".to_string(),
                message: "Amount paid cannot be negative".to_string(),
            });
        }
        match input.payment_status {
            PaymentStatus::Overdue => Err(AppError::Validation {
                field: "payment_status".to_string(),
                message: "An order cannot be created overdue".to_string(),
            }),
            PaymentStatus::Credit if input.payday.is_none() => Err(AppError::Validation {
                field: "payday".to_string(),
                message: "A credit order needs a payday".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Row for sale listing query
#[derive(Debug, FromRow)]
struct SaleListingRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i64,
    total_amount: Decimal,
    sale_date: DateTime<Utc>,
    item_name: String,
    brand_name: String,
    model_name: String,
}
