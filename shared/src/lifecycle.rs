//! Order payment lifecycle rules
//!
//! Pure transition rules for the order state machine:
//! `unconfirmed -> confirmed/credit -> confirmed/paid` and
//! `confirmed/credit -> confirmed/overdue -> confirmed/paid`.
//! The backend applies these under its own transactions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::PaymentStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("order is already fully paid")]
    AlreadyPaid,

    #[error("amount paid {paid} exceeds order total {total}")]
    OverPayment { paid: Decimal, total: Decimal },
}

/// Result of settling an order in full
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub status: PaymentStatus,
}

/// Opening balance of a freshly created order.
///
/// Credit orders owe the total minus whatever was paid up front; a cash
/// order settles immediately and carries no balance. Returns the effective
/// `(amount_paid, balance)` pair.
pub fn opening_balance(
    status: PaymentStatus,
    total_amount: Decimal,
    amount_paid: Decimal,
) -> Result<(Decimal, Decimal), LifecycleError> {
    match status {
        PaymentStatus::Credit => {
            if amount_paid > total_amount {
                return Err(LifecycleError::OverPayment {
                    paid: amount_paid,
                    total: total_amount,
                });
            }
            Ok((amount_paid, total_amount - amount_paid))
        }
        // Paid and (degenerate) overdue openings settle in full
        _ => Ok((total_amount, Decimal::ZERO)),
    }
}

/// Settle an order in full. Payment is all-or-nothing: the outstanding
/// balance drops to zero and the status becomes `paid`.
pub fn settle(total_amount: Decimal, balance: Decimal) -> Result<Settlement, LifecycleError> {
    if balance <= Decimal::ZERO {
        return Err(LifecycleError::AlreadyPaid);
    }

    Ok(Settlement {
        amount_paid: total_amount,
        balance: Decimal::ZERO,
        status: PaymentStatus::Paid,
    })
}

/// Whether the overdue sweep should transition this order.
///
/// Only confirmed credit orders past their payday with an unpaid remainder
/// qualify; paid and already-overdue orders are never touched, so the sweep
/// is idempotent.
pub fn is_sweepable(
    confirmed: bool,
    payday: Option<DateTime<Utc>>,
    total_amount: Decimal,
    amount_paid: Decimal,
    status: PaymentStatus,
    now: DateTime<Utc>,
) -> bool {
    confirmed
        && payday.is_some_and(|due| due < now)
        && amount_paid < total_amount
        && status != PaymentStatus::Paid
        && status != PaymentStatus::Overdue
}
