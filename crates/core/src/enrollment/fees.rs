//! Fee ledger.
//!
//! `total_amount` is the assessment subtotal plus `total_units × rate`.
//! The subtotal is not stored. Before every recomputation it is derived
//! back out of the current amount by subtracting the current subject
//! fees, then added to the subject fees for the new unit count.
//!
//! Derivation assumes the rate has not changed since the amount was last
//! computed. Results are floored at zero so a rate change can never make
//! `total_amount` negative, and returned at money scale so the value handed
//! back equals the value a `NUMERIC(14,2)` column stores.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use enrollo_shared::types::round_money;

use crate::enrollment::types::{FeeBreakdown, PaymentStatus, PaymentTransaction};

/// Unit count and amount due for an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerTotals {
    /// Sum of units over the line items.
    pub total_units: u32,
    /// Amount due.
    pub total_amount: Decimal,
}

/// Outstanding balance report for an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    /// Amount due.
    pub total_amount: Decimal,
    /// Sum of completed payments.
    pub paid: Decimal,
    /// Sum of payments awaiting verification.
    pub pending: Decimal,
    /// `total_amount - paid`, floored at zero.
    pub outstanding: Decimal,
}

/// Recomputes enrollment totals at a fixed per-unit rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeLedger {
    per_unit_rate: Decimal,
}

impl FeeLedger {
    /// Creates a ledger charging `per_unit_rate` per unit.
    ///
    /// The rate must have at most two decimal places (see
    /// `EnrollmentConfig::validate`); otherwise the subtotal derived from a
    /// stored amount drifts between recomputations.
    #[must_use]
    pub const fn new(per_unit_rate: Decimal) -> Self {
        Self { per_unit_rate }
    }

    /// Charge for `units` units.
    #[must_use]
    pub fn subject_fees(&self, units: u32) -> Decimal {
        Decimal::from(units) * self.per_unit_rate
    }

    /// Assessment subtotal embedded in `current`.
    ///
    /// Zero until the enrollment has been assessed.
    #[must_use]
    pub fn assessment_subtotal(&self, current: LedgerTotals, assessed: bool) -> Decimal {
        if assessed {
            current.total_amount - self.subject_fees(current.total_units)
        } else {
            Decimal::ZERO
        }
    }

    /// Totals after the unit count changes to `new_units`.
    #[must_use]
    pub fn recompute(&self, current: LedgerTotals, assessed: bool, new_units: u32) -> LedgerTotals {
        let subtotal = self.assessment_subtotal(current, assessed);
        LedgerTotals {
            total_units: new_units,
            total_amount: to_amount(subtotal + self.subject_fees(new_units)),
        }
    }

    /// Totals after adding a subject worth `units`.
    #[must_use]
    pub fn add_subject(&self, current: LedgerTotals, assessed: bool, units: u32) -> LedgerTotals {
        self.recompute(current, assessed, current.total_units.saturating_add(units))
    }

    /// Totals after removing a subject worth `units`; units never go below zero.
    #[must_use]
    pub fn remove_subject(
        &self,
        current: LedgerTotals,
        assessed: bool,
        units: u32,
    ) -> LedgerTotals {
        self.recompute(current, assessed, current.total_units.saturating_sub(units))
    }

    /// Totals after assessing `fees` on top of the current subject load.
    #[must_use]
    pub fn assess(&self, total_units: u32, fees: &FeeBreakdown) -> LedgerTotals {
        LedgerTotals {
            total_units,
            total_amount: to_amount(fees.subtotal() + self.subject_fees(total_units)),
        }
    }

    /// Balance of `total_amount` against the recorded payments.
    #[must_use]
    pub fn balance(total_amount: Decimal, payments: &[PaymentTransaction]) -> BalanceSummary {
        let sum_of = |status: PaymentStatus| -> Decimal {
            payments
                .iter()
                .filter(|p| p.status == status)
                .map(|p| p.amount)
                .sum()
        };
        let paid = sum_of(PaymentStatus::Completed);
        let pending = sum_of(PaymentStatus::Pending);

        BalanceSummary {
            total_amount: round_money(total_amount),
            paid: round_money(paid),
            pending: round_money(pending),
            outstanding: to_amount(total_amount - paid),
        }
    }
}

/// Floors at zero and rounds to money scale.
fn to_amount(amount: Decimal) -> Decimal {
    round_money(amount.max(Decimal::ZERO))
}
