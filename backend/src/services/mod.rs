//! Business logic services for the Warehouse Trade Management backend

pub mod allocation;
pub mod client;
pub mod order;
pub mod stock;

pub use allocation::AllocationService;
pub use client::ClientService;
pub use order::OrderService;
pub use stock::StockService;

use crate::error::{AppError, AppResult};
use shared::types::{EntryStatus, OrderKind, PaymentStatus};

/// Parse a status column read from the database. An unknown value means the
/// row was written outside the application's mutation paths.
pub(crate) fn parse_payment_status(s: &str) -> AppResult<PaymentStatus> {
    PaymentStatus::from_str(s)
        .ok_or_else(|| AppError::IntegrityViolation(format!("unknown order status '{}'", s)))
}

pub(crate) fn parse_entry_status(s: &str) -> AppResult<EntryStatus> {
    EntryStatus::from_str(s)
        .ok_or_else(|| AppError::IntegrityViolation(format!("unknown entry status '{}'", s)))
}

pub(crate) fn parse_order_kind(s: &str) -> AppResult<OrderKind> {
    OrderKind::from_str(s)
        .ok_or_else(|| AppError::IntegrityViolation(format!("unknown order kind '{}'", s)))
}
