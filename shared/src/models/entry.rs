//! Stock entry (lot) model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::EntryStatus;

/// One received batch of stock, consumed FIFO by order confirmation.
///
/// Entries are never deleted: a fully consumed entry keeps its row with
/// `sold_out = true`, preserving the purchase history of the lot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    /// Lot size as received
    pub quantity: i64,
    /// Cumulative amount consumed from this lot
    pub sold_quantity: i64,
    /// True iff `sold_quantity == quantity`
    pub sold_out: bool,
    pub status: EntryStatus,
    /// FIFO ordering key
    pub entry_date: DateTime<Utc>,
    pub purchase_price: Decimal,
    pub accepted_by: Option<Uuid>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl StockEntry {
    /// Unconsumed capacity of this lot
    pub fn remaining(&self) -> i64 {
        self.quantity - self.sold_quantity
    }
}
