//! Client order and order line models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{OrderKind, PaymentStatus};

/// One credit or cash sale to a client.
///
/// Created unconfirmed with zero totals; the creating transaction prices the
/// line items and rolls the totals up before the order becomes visible.
/// `confirmed` transitions exactly once, on stock allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOrder {
    pub id: Uuid,
    pub client_id: Uuid,
    pub warehouse_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub kind: OrderKind,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub status: PaymentStatus,
    pub confirmed: bool,
    /// Due date for credit orders
    pub payday: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One line item of a client order, priced at order creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSale {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i64,
    /// Quantity times the unit price frozen at order creation
    pub total_amount: Decimal,
    pub kind: OrderKind,
    pub sale_date: DateTime<Utc>,
}

/// Order line joined with its catalog names, for order detail views
#[derive(Debug, Clone, Serialize)]
pub struct ProductSaleListing {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub total_amount: Decimal,
    pub sale_date: DateTime<Utc>,
    pub item_name: String,
    pub brand_name: String,
    pub model_name: String,
}
