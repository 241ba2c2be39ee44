//! Stock ledger tests
//!
//! Tests for ledger arithmetic around the allocation engine:
//! - Availability is the sum of unconsumed lot capacity
//! - Deleting a confirmed order restores the ledger (reverse-FIFO)

use proptest::prelude::*;
use uuid::Uuid;

use shared::allocation::{available_quantity, plan, LineRequest, LotSnapshot, ProductStock};
use shared::models::StockEntry;
use shared::types::EntryStatus;

fn lot(id: u128, quantity: i64, sold: i64) -> LotSnapshot {
    LotSnapshot {
        id: Uuid::from_u128(id),
        quantity,
        sold_quantity: sold,
    }
}

/// Simulate the compensating restoration the order-deletion path performs:
/// give `quantity` units back to the lots, newest first
fn restore_newest_first(lots: &mut [LotSnapshot], quantity: i64) -> Result<(), &'static str> {
    let mut remaining = quantity;
    for lot in lots.iter_mut().rev() {
        if remaining == 0 {
            break;
        }
        let give_back = lot.sold_quantity.min(remaining);
        lot.sold_quantity -= give_back;
        remaining -= give_back;
    }

    if remaining > 0 {
        return Err("lots cannot absorb restored quantity");
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    /// Availability sums unconsumed capacity, nothing else
    #[test]
    fn test_availability_is_unconsumed_capacity() {
        let lots = vec![lot(1, 10, 4), lot(2, 5, 0), lot(3, 3, 3)];
        assert_eq!(available_quantity(&lots), 11);
    }

    /// A fully consumed lot contributes zero
    #[test]
    fn test_sold_out_lot_contributes_nothing() {
        assert_eq!(available_quantity(&[lot(1, 7, 7)]), 0);
    }

    #[test]
    fn test_empty_ledger_has_nothing_to_sell() {
        assert_eq!(available_quantity(&[]), 0);
    }

    /// A pending entry's remaining capacity exists on the model but must
    /// not be offered for sale until acceptance
    #[test]
    fn test_pending_entry_remaining() {
        let entry = StockEntry {
            id: Uuid::from_u128(1),
            product_id: Uuid::from_u128(2),
            warehouse_id: Uuid::from_u128(3),
            quantity: 12,
            sold_quantity: 0,
            sold_out: false,
            status: EntryStatus::Pending,
            entry_date: Utc::now(),
            purchase_price: Decimal::new(1999, 2),
            accepted_by: None,
            accepted_at: None,
            created_at: Utc::now(),
        };

        assert_eq!(entry.remaining(), 12);
        assert_eq!(entry.status, EntryStatus::Pending);
    }

    /// Restoring after a FIFO consumption refills the newest lot first
    #[test]
    fn test_restore_refills_newest_first() {
        // After consuming 7 from [5, 5]: sold = [5, 2]
        let mut lots = vec![lot(1, 5, 5), lot(2, 5, 2)];
        restore_newest_first(&mut lots, 7).unwrap();

        assert_eq!(lots[0].sold_quantity, 0);
        assert_eq!(lots[1].sold_quantity, 0);
    }

    /// Partial restoration leaves the oldest consumption in place
    #[test]
    fn test_partial_restore_keeps_oldest_consumption() {
        let mut lots = vec![lot(1, 5, 5), lot(2, 5, 2)];
        restore_newest_first(&mut lots, 3).unwrap();

        // The newest lot gives back its 2 first, then the older one gives 1
        assert_eq!(lots[1].sold_quantity, 0);
        assert_eq!(lots[0].sold_quantity, 4);
    }

    /// Restoring more than was ever sold is a ledger fault
    #[test]
    fn test_over_restore_detected() {
        let mut lots = vec![lot(1, 5, 2)];
        assert!(restore_newest_first(&mut lots, 3).is_err());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn fresh_lots_strategy() -> impl Strategy<Value = Vec<LotSnapshot>> {
        prop::collection::vec(1i64..=50, 1..6).prop_map(|sizes| {
            sizes
                .into_iter()
                .enumerate()
                .map(|(i, quantity)| lot(100 + i as u128, quantity, 0))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Consume-then-restore is the identity on the ledger: deleting a
        /// confirmed order leaves every lot exactly as it was
        #[test]
        fn prop_restore_inverts_consumption(lots in fresh_lots_strategy(), fraction in 0.0f64..=1.0) {
            let original = lots.clone();
            let available = available_quantity(&lots);
            let requested = (available as f64 * fraction) as i64;

            let stock = vec![ProductStock {
                product_id: Uuid::from_u128(1),
                quantity: available,
                open_lots: lots.clone(),
            }];
            let planned = plan(
                &[LineRequest { product_id: Uuid::from_u128(1), quantity: requested }],
                &stock,
            )
            .unwrap();

            // Apply the draws, then restore the same quantity newest-first
            let mut consumed = lots;
            for draw in &planned.items[0].draws {
                let lot = consumed.iter_mut().find(|l| l.id == draw.lot_id).unwrap();
                lot.sold_quantity += draw.consumed;
            }
            restore_newest_first(&mut consumed, requested).unwrap();

            prop_assert_eq!(consumed, original);
        }

        /// Restoration never exceeds lot capacity downward: sold quantities
        /// stay non-negative
        #[test]
        fn prop_restore_keeps_sold_non_negative(
            lots in fresh_lots_strategy(),
            fraction in 0.0f64..=1.0
        ) {
            let available = available_quantity(&lots);
            let requested = (available as f64 * fraction) as i64;

            let mut consumed: Vec<LotSnapshot> = lots
                .into_iter()
                .map(|mut l| {
                    l.sold_quantity = l.quantity;
                    l
                })
                .collect();

            // Everything was sold; restoring any partial amount is fine
            restore_newest_first(&mut consumed, requested).unwrap();
            for lot in &consumed {
                prop_assert!(lot.sold_quantity >= 0);
                prop_assert!(lot.sold_quantity <= lot.quantity);
            }
        }
    }
}
