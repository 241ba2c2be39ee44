//! Stock allocation engine: order confirmation
//!
//! Confirmation consumes stock lots FIFO under a per-product exclusive
//! section. The FIFO arithmetic itself is the pure planner in
//! `shared::allocation`; this service supplies the snapshots, holds the row
//! locks that keep them stable, and applies the plan with guarded updates so
//! that a writer slipping past the locks aborts the transaction instead of
//! over-allocating.
//!
//! Confirmation is all-or-nothing: any failure rolls the transaction back
//! and no partial consumption is ever observable.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::allocation::{plan, LineRequest, LotSnapshot, PlanError, ProductStock};
use crate::models::ClientOrder;

use super::order::{OrderRow, ORDER_COLUMNS};

/// Bounded internal retries for lot-guard conflicts before the failure
/// surfaces to the caller as transient.
const MAX_ATTEMPTS: u32 = 3;

/// Allocation service driving order confirmation
#[derive(Clone)]
pub struct AllocationService {
    db: PgPool,
}

impl AllocationService {
    /// Create a new AllocationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Confirm an order: consume its line items from stock FIFO and mark
    /// the order confirmed. The only path that sets `confirmed`.
    pub async fn confirm_order(&self, order_id: Uuid) -> AppResult<ClientOrder> {
        let mut attempt = 1;
        loop {
            match self.try_confirm(order_id).await {
                Err(AppError::AllocationRace) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(order_id = %order_id, attempt, "allocation conflict, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn try_confirm(&self, order_id: Uuid) -> AppResult<ClientOrder> {
        let mut tx = self.db.begin().await?;

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM client_orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        if order.confirmed {
            return Err(AppError::AlreadyConfirmed(order_id));
        }

        let lines = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT product_id, quantity FROM product_sales WHERE order_id = $1 ORDER BY product_id",
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;

        let items: Vec<LineRequest> = lines
            .iter()
            .map(|(product_id, quantity)| LineRequest {
                product_id: *product_id,
                quantity: *quantity,
            })
            .collect();

        let stock = self.lock_and_snapshot(&mut tx, &items).await?;

        let allocation = plan(&items, &stock).map_err(|err| match err {
            PlanError::InsufficientStock {
                product_id,
                available,
                requested,
            } => AppError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            PlanError::LedgerMismatch {
                product_id,
                aggregate,
                lot_sum,
            } => {
                tracing::error!(
                    product_id = %product_id,
                    aggregate,
                    lot_sum,
                    "ledger invariant violated during confirmation"
                );
                AppError::IntegrityViolation(format!(
                    "product {} aggregate quantity {} diverges from lot sum {}",
                    product_id, aggregate, lot_sum
                ))
            }
            PlanError::UnknownProduct(product_id) => {
                AppError::NotFound(format!("Product {}", product_id))
            }
            PlanError::NegativeQuantity { product_id, .. } => AppError::IntegrityViolation(
                format!("negative line quantity stored for product {}", product_id),
            ),
        })?;

        // Apply the plan. Every lot update is guarded by the sold_quantity
        // the plan was computed against; a miss means a concurrent writer
        // got between the locks and the update, and the whole confirmation
        // starts over.
        for item in &allocation.items {
            for draw in &item.draws {
                let result = sqlx::query(
                    r#"
                    UPDATE stock_entries
                    SET sold_quantity = sold_quantity + $1, sold_out = $2
                    WHERE id = $3 AND sold_quantity = $4
                    "#,
                )
                .bind(draw.consumed)
                .bind(draw.sold_out)
                .bind(draw.lot_id)
                .bind(draw.previous_sold)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::AllocationRace);
                }
            }

            if item.requested > 0 {
                // One arithmetic update per line item keeps the aggregate in
                // lockstep with the lot decrements committed above
                let result = sqlx::query(
                    "UPDATE products SET quantity = quantity - $1 WHERE id = $2 AND quantity >= $1",
                )
                .bind(item.requested)
                .bind(item.product_id)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::AllocationRace);
                }
            }
        }

        let confirmed = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE client_orders SET confirmed = TRUE WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, lines = allocation.items.len(), "order confirmed");

        confirmed.into_model()
    }

    /// Lock the line items' product rows (ascending id, so concurrent
    /// confirmations sharing products cannot deadlock) and snapshot their
    /// aggregate quantities and open lots in FIFO order.
    async fn lock_and_snapshot(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        items: &[LineRequest],
    ) -> AppResult<Vec<ProductStock>> {
        let mut product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
        product_ids.sort();
        product_ids.dedup();

        let products = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT id, quantity FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&product_ids)
        .fetch_all(&mut **tx)
        .await?;

        if products.len() != product_ids.len() {
            let found: Vec<Uuid> = products.iter().map(|(id, _)| *id).collect();
            let missing = product_ids
                .iter()
                .find(|id| !found.contains(id))
                .copied()
                .unwrap_or_default();
            return Err(AppError::NotFound(format!("Product {}", missing)));
        }

        let mut stock = Vec::with_capacity(products.len());
        for (product_id, quantity) in products {
            let lots = sqlx::query_as::<_, (Uuid, i64, i64)>(
                r#"
                SELECT id, quantity, sold_quantity
                FROM stock_entries
                WHERE product_id = $1 AND status = 'done' AND sold_out = FALSE
                ORDER BY entry_date ASC, seq ASC
                "#,
            )
            .bind(product_id)
            .fetch_all(&mut **tx)
            .await?;

            stock.push(ProductStock {
                product_id,
                quantity,
                open_lots: lots
                    .into_iter()
                    .map(|(id, quantity, sold_quantity)| LotSnapshot {
                        id,
                        quantity,
                        sold_quantity,
                    })
                    .collect(),
            });
        }

        Ok(stock)
    }
}
