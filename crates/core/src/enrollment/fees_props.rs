//! Property-based tests for the fee ledger.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::enrollment::fees::{FeeLedger, LedgerTotals};
use crate::enrollment::types::FeeBreakdown;

/// Amounts in cents between 0 and 100,000.00.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_rate() -> impl Strategy<Value = Decimal> {
    (1i64..500_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_fees() -> impl Strategy<Value = FeeBreakdown> {
    (
        arb_amount(),
        arb_amount(),
        arb_amount(),
        arb_amount(),
        arb_amount(),
        arb_amount(),
    )
        .prop_map(|(tuition, registration, library, lab, id_fee, others)| FeeBreakdown {
            tuition,
            registration,
            library,
            lab,
            id_fee,
            others,
        })
}

/// A sequence of subject changes: `true` adds, `false` removes.
fn arb_changes() -> impl Strategy<Value = Vec<(bool, u32)>> {
    prop::collection::vec((any::<bool>(), 1u32..6), 0..20)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any add/remove sequence after assessment keeps
    /// total_amount == subtotal + units × rate.
    #[test]
    fn prop_assessed_amount_tracks_units(
        rate in arb_rate(),
        fees in arb_fees(),
        start_units in 0u32..10,
        changes in arb_changes(),
    ) {
        let ledger = FeeLedger::new(rate);
        let mut current = ledger.assess(start_units, &fees);

        for (add, units) in changes {
            current = if add {
                ledger.add_subject(current, true, units)
            } else {
                ledger.remove_subject(current, true, units)
            };
            prop_assert_eq!(
                current.total_amount,
                fees.subtotal() + ledger.subject_fees(current.total_units)
            );
        }
    }

    /// Before assessment the amount is exactly the subject fees.
    #[test]
    fn prop_unassessed_amount_is_subject_fees(
        rate in arb_rate(),
        changes in arb_changes(),
    ) {
        let ledger = FeeLedger::new(rate);
        let mut current = LedgerTotals::default();

        for (add, units) in changes {
            current = if add {
                ledger.add_subject(current, false, units)
            } else {
                ledger.remove_subject(current, false, units)
            };
            prop_assert_eq!(current.total_amount, ledger.subject_fees(current.total_units));
        }
    }

    /// Adding then removing the same subject restores the totals.
    #[test]
    fn prop_add_remove_is_identity(
        rate in arb_rate(),
        fees in arb_fees(),
        start_units in 0u32..10,
        units in 1u32..6,
    ) {
        let ledger = FeeLedger::new(rate);
        let before = ledger.assess(start_units, &fees);
        let after = ledger.remove_subject(ledger.add_subject(before, true, units), true, units);
        prop_assert_eq!(before, after);
    }

    /// A rate change between calls never produces a negative amount.
    #[test]
    fn prop_amount_never_negative(
        old_rate in arb_rate(),
        new_rate in arb_rate(),
        fees in arb_fees(),
        start_units in 0u32..10,
        changes in arb_changes(),
    ) {
        let mut current = FeeLedger::new(old_rate).assess(start_units, &fees);
        let ledger = FeeLedger::new(new_rate);

        for (add, units) in changes {
            current = if add {
                ledger.add_subject(current, true, units)
            } else {
                ledger.remove_subject(current, true, units)
            };
            prop_assert!(current.total_amount >= Decimal::ZERO);
        }
    }
}
