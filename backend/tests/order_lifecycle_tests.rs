//! Order lifecycle tests
//!
//! Tests for the payment/overdue state machine:
//! - Opening balance arithmetic for credit and cash orders
//! - All-or-nothing settlement and its idempotence
//! - Overdue sweep eligibility and payment-wins ordering

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use shared::lifecycle::{is_sweepable, opening_balance, settle, LifecycleError};
use shared::types::PaymentStatus;

fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

fn at(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Credit order of 1000 with 200 paid up front opens owing 800
    #[test]
    fn test_credit_opening_balance() {
        let (paid, balance) =
            opening_balance(PaymentStatus::Credit, dec(1000), dec(200)).unwrap();
        assert_eq!(paid, dec(200));
        assert_eq!(balance, dec(800));
    }

    /// A cash sale opens fully settled regardless of the reported upfront
    /// payment
    #[test]
    fn test_cash_sale_opens_settled() {
        let (paid, balance) = opening_balance(PaymentStatus::Paid, dec(750), dec(0)).unwrap();
        assert_eq!(paid, dec(750));
        assert_eq!(balance, Decimal::ZERO);
    }

    /// Settling the 800 balance pays the order in full
    #[test]
    fn test_settlement_clears_balance() {
        let settlement = settle(dec(1000), dec(800)).unwrap();
        assert_eq!(settlement.amount_paid, dec(1000));
        assert_eq!(settlement.balance, Decimal::ZERO);
        assert_eq!(settlement.status, PaymentStatus::Paid);
    }

    /// Settling twice fails the second time and would leave the order
    /// untouched
    #[test]
    fn test_double_settlement_rejected() {
        let settlement = settle(dec(1000), dec(1000)).unwrap();
        let second = settle(dec(1000), settlement.balance);
        assert_eq!(second.unwrap_err(), LifecycleError::AlreadyPaid);
    }

    /// Sweep eligibility: confirmed + past payday + unpaid remainder
    #[test]
    fn test_sweep_eligibility() {
        let now = at(10_000);
        let due = Some(at(9_999));

        assert!(is_sweepable(true, due, dec(100), dec(0), PaymentStatus::Credit, now));
        assert!(!is_sweepable(false, due, dec(100), dec(0), PaymentStatus::Credit, now));
        assert!(!is_sweepable(true, Some(at(10_001)), dec(100), dec(0), PaymentStatus::Credit, now));
    }

    /// Sweep idempotence: an order already overdue is not eligible again
    #[test]
    fn test_sweep_is_idempotent() {
        let now = at(10_000);
        let due = Some(at(1));

        assert!(is_sweepable(true, due, dec(100), dec(20), PaymentStatus::Credit, now));
        // After the first sweep the status is overdue; the second run skips it
        assert!(!is_sweepable(true, due, dec(100), dec(20), PaymentStatus::Overdue, now));
    }

    /// Payment wins over a concurrent sweep: once settled, the order is no
    /// longer sweepable no matter how stale the payday is
    #[test]
    fn test_payment_wins_over_sweep() {
        let now = at(10_000);
        let due = Some(at(1));

        let settlement = settle(dec(100), dec(100)).unwrap();
        assert!(!is_sweepable(
            true,
            due,
            dec(100),
            settlement.amount_paid,
            settlement.status,
            now
        ));
    }

    /// Payday exactly at the sweep instant is not yet overdue
    #[test]
    fn test_payday_boundary_not_overdue() {
        let now = at(10_000);
        assert!(!is_sweepable(true, Some(now), dec(100), dec(0), PaymentStatus::Credit, now));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for money amounts with two decimal places
    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=10_000_000).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Opening a credit order: paid + balance always reconstructs the
        /// total
        #[test]
        fn prop_credit_opening_reconstructs_total(
            total in amount_strategy(),
            fraction in 0.0f64..=1.0
        ) {
            let upfront = total * Decimal::try_from(fraction).unwrap();
            let upfront = upfront.round_dp(2);

            let (paid, balance) =
                opening_balance(PaymentStatus::Credit, total, upfront).unwrap();
            prop_assert_eq!(paid + balance, total);
            prop_assert!(balance >= Decimal::ZERO);
        }

        /// Overpayment is always rejected
        #[test]
        fn prop_overpayment_rejected(total in amount_strategy(), extra in 1i64..=1000) {
            let paid = total + Decimal::new(extra, 2);
            let result = opening_balance(PaymentStatus::Credit, total, paid);
            prop_assert!(matches!(result, Err(LifecycleError::OverPayment { .. })), "expected OverPayment error");
        }

        /// Settlement always zeroes the balance and pays the full total,
        /// whatever the outstanding remainder was
        #[test]
        fn prop_settlement_is_total(total in amount_strategy(), fraction in 0.001f64..=1.0) {
            let balance = (total * Decimal::try_from(fraction).unwrap()).round_dp(2);
            prop_assume!(balance > Decimal::ZERO);

            let settlement = settle(total, balance).unwrap();
            prop_assert_eq!(settlement.amount_paid, total);
            prop_assert_eq!(settlement.balance, Decimal::ZERO);
            prop_assert_eq!(settlement.status, PaymentStatus::Paid);
        }

        /// A settled order is never sweepable
        #[test]
        fn prop_settled_never_sweepable(
            total in amount_strategy(),
            due_ts in 0i64..=1_000_000,
            now_ts in 0i64..=1_000_000
        ) {
            prop_assume!(total > Decimal::ZERO);
            let settlement = settle(total, total).unwrap();

            prop_assert!(!is_sweepable(
                true,
                Some(at(due_ts)),
                total,
                settlement.amount_paid,
                settlement.status,
                at(now_ts)
            ));
        }

        /// Sweeping is monotone in time: an order sweepable now stays
        /// sweepable later if nothing is paid
        #[test]
        fn prop_sweepable_stays_sweepable(
            total in amount_strategy(),
            paid_fraction in 0.0f64..0.999,
            due_ts in 0i64..=1000,
            delta in 1i64..=1000
        ) {
            prop_assume!(total > Decimal::ZERO);
            let paid = (total * Decimal::try_from(paid_fraction).unwrap()).round_dp(2);
            prop_assume!(paid < total);

            let now = at(due_ts + 1);
            let later = at(due_ts + 1 + delta);
            let due = Some(at(due_ts));

            if is_sweepable(true, due, total, paid, PaymentStatus::Credit, now) {
                prop_assert!(is_sweepable(true, due, total, paid, PaymentStatus::Credit, later));
            }
        }
    }
}
