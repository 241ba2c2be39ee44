//! FIFO stock allocation planner
//!
//! Pure planning logic for committing an order's line items against a
//! product's stock lots. The planner works on in-memory snapshots and
//! produces a list of lot draws; applying the draws to durable storage (and
//! holding the locks that keep the snapshots stable) is the backend's job.
//!
//! Planning is all-or-nothing: availability is checked across every line
//! item before a single draw is computed, so a shortage on a later item can
//! never leave earlier items partially consumed.

use thiserror::Error;
use uuid::Uuid;

/// Snapshot of one open lot, FIFO-ordered by the caller
/// (`entry_date ASC`, insertion order as tie-break).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotSnapshot {
    pub id: Uuid,
    /// Lot size as received
    pub quantity: i64,
    /// Already consumed from this lot
    pub sold_quantity: i64,
}

impl LotSnapshot {
    pub fn remaining(&self) -> i64 {
        self.quantity - self.sold_quantity
    }
}

/// Snapshot of one product's sellable stock: the aggregate counter and its
/// open (not sold out, accepted) lots in FIFO order.
#[derive(Debug, Clone)]
pub struct ProductStock {
    pub product_id: Uuid,
    /// The product row's aggregate quantity
    pub quantity: i64,
    pub open_lots: Vec<LotSnapshot>,
}

/// One line item to allocate
#[derive(Debug, Clone, Copy)]
pub struct LineRequest {
    pub product_id: Uuid,
    pub quantity: i64,
}

/// A single consumption from one lot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotDraw {
    pub lot_id: Uuid,
    /// The lot's `sold_quantity` the draw was planned against; the executor
    /// guards its update with this value to detect concurrent writers.
    pub previous_sold: i64,
    pub consumed: i64,
    /// True when this draw exhausts the lot
    pub sold_out: bool,
}

/// Allocation of one line item: the lot draws plus the single aggregate
/// decrement applied to the product row.
#[derive(Debug, Clone)]
pub struct ItemAllocation {
    pub product_id: Uuid,
    pub requested: i64,
    pub draws: Vec<LotDraw>,
}

/// Complete plan for confirming one order
#[derive(Debug, Clone, Default)]
pub struct AllocationPlan {
    pub items: Vec<ItemAllocation>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: Uuid,
        available: i64,
        requested: i64,
    },

    /// The aggregate counter disagrees with the lot ledger. Fatal: the
    /// invariant was already broken by some other writer and must not be
    /// silently corrected here.
    #[error("ledger mismatch for product {product_id}: aggregate {aggregate}, lot sum {lot_sum}")]
    LedgerMismatch {
        product_id: Uuid,
        aggregate: i64,
        lot_sum: i64,
    },

    #[error("line item references unknown product {0}")]
    UnknownProduct(Uuid),

    #[error("negative quantity {quantity} requested for product {product_id}")]
    NegativeQuantity { product_id: Uuid, quantity: i64 },
}

/// Sellable quantity over a product's open lots.
///
/// Sold-out lots contribute zero remaining capacity, so summing open lots
/// equals summing all accepted lots.
pub fn available_quantity(lots: &[LotSnapshot]) -> i64 {
    lots.iter().map(LotSnapshot::remaining).sum()
}

/// Plan the FIFO allocation of `items` against `stock`.
///
/// Phase one checks every line item's availability (and the ledger
/// invariant) before anything is consumed; phase two walks each item's lots
/// oldest-first. A zero-quantity line item passes through with no draws.
pub fn plan(items: &[LineRequest], stock: &[ProductStock]) -> Result<AllocationPlan, PlanError> {
    // Pre-check phase: run to completion across all items before any draw
    for item in items {
        if item.quantity < 0 {
            return Err(PlanError::NegativeQuantity {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }

        let product = stock_for(stock, item.product_id)?;
        let lot_sum = available_quantity(&product.open_lots);

        if lot_sum != product.quantity {
            return Err(PlanError::LedgerMismatch {
                product_id: product.product_id,
                aggregate: product.quantity,
                lot_sum,
            });
        }

        if item.quantity > lot_sum {
            return Err(PlanError::InsufficientStock {
                product_id: item.product_id,
                available: lot_sum,
                requested: item.quantity,
            });
        }
    }

    // Consumption phase: the pre-check guarantees every item is satisfiable,
    // so lots are walked per item without cross-item bookkeeping. Items for
    // the same product are rare but legal; track consumption per lot so a
    // second item continues where the first stopped.
    let mut consumed_by_lot: std::collections::HashMap<Uuid, i64> = std::collections::HashMap::new();
    let mut plan = AllocationPlan::default();

    for item in items {
        let product = stock_for(stock, item.product_id)?;
        let mut remaining = item.quantity;
        let mut draws = Vec::new();

        for lot in &product.open_lots {
            if remaining == 0 {
                break;
            }

            let already_drawn = consumed_by_lot.get(&lot.id).copied().unwrap_or(0);
            let previous_sold = lot.sold_quantity + already_drawn;
            let capacity = lot.quantity - previous_sold;
            if capacity == 0 {
                continue;
            }

            let take = capacity.min(remaining);
            draws.push(LotDraw {
                lot_id: lot.id,
                previous_sold,
                consumed: take,
                sold_out: previous_sold + take == lot.quantity,
            });
            consumed_by_lot.insert(lot.id, already_drawn + take);
            remaining -= take;
        }

        // Unreachable after a passed pre-check; kept as a hard stop so a
        // broken snapshot can never produce a partial plan.
        if remaining > 0 {
            return Err(PlanError::InsufficientStock {
                product_id: item.product_id,
                available: item.quantity - remaining,
                requested: item.quantity,
            });
        }

        plan.items.push(ItemAllocation {
            product_id: item.product_id,
            requested: item.quantity,
            draws,
        });
    }

    Ok(plan)
}

fn stock_for(stock: &[ProductStock], product_id: Uuid) -> Result<&ProductStock, PlanError> {
    stock
        .iter()
        .find(|p| p.product_id == product_id)
        .ok_or(PlanError::UnknownProduct(product_id))
}
