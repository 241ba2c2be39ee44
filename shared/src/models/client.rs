//! Client models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A client buying on credit or cash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-client debt summary across all orders
#[derive(Debug, Clone, Serialize)]
pub struct ClientDebtSummary {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    /// Sum of outstanding balances
    pub total_debt: Decimal,
    /// Outstanding balance on orders past their payday
    pub overdue_debt: Decimal,
    /// Orders awaiting confirmation
    pub unconfirmed_count: i64,
}
