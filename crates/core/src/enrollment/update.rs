//! Partial updates produced by state transitions.
//!
//! A transition never mutates the enrollment it is given. It returns a
//! [`Transition`] describing exactly which fields change, which line item
//! or payment row is touched, and the audit entry to record. Persistence
//! applies all of it in one database transaction.

use enrollo_shared::types::{EnrollmentSubjectId, SubjectId, TransactionId};

use crate::enrollment::fees::LedgerTotals;
use crate::enrollment::types::{
    AuditEntry, Enrollment, EnrollmentAction, EnrollmentStatus, EnrollmentSubject, FeeBreakdown,
    PaymentStatus, PaymentTransaction, Stamp,
};

/// Change to a clearable field.
///
/// `Keep` leaves the stored value alone, which is different from `Clear`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    /// Leave the value unchanged.
    #[default]
    Keep,
    /// Replace the value.
    Set(T),
    /// Reset the value to null.
    Clear,
}

impl<T: Clone> FieldUpdate<T> {
    /// Applies the change to `field`.
    pub fn apply(&self, field: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Set(value) => *field = Some(value.clone()),
            Self::Clear => *field = None,
        }
    }
}

impl FieldUpdate<String> {
    /// Interprets caller-supplied remarks.
    ///
    /// Absent remarks keep the stored value, blank remarks clear it.
    #[must_use]
    pub fn from_remarks(remarks: Option<&str>) -> Self {
        match remarks.map(str::trim) {
            None => Self::Keep,
            Some("") => Self::Clear,
            Some(text) => Self::Set(text.to_string()),
        }
    }
}

/// Enrollment columns written by a transition. `None` means untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnrollmentUpdate {
    /// New status.
    pub status: Option<EnrollmentStatus>,
    /// New unit count and amount.
    pub totals: Option<LedgerTotals>,
    /// New fee breakdown.
    pub fees: Option<FeeBreakdown>,
    /// Assessment stamp.
    pub assessed: Option<Stamp>,
    /// Approval stamp.
    pub approved: Option<Stamp>,
    /// Remarks.
    pub remarks: FieldUpdate<String>,
}

impl EnrollmentUpdate {
    /// Applies the update to an in-memory enrollment.
    pub fn apply_to(&self, enrollment: &mut Enrollment) {
        if let Some(status) = self.status {
            enrollment.status = status;
        }
        if let Some(totals) = self.totals {
            enrollment.total_units = totals.total_units;
            enrollment.total_amount = totals.total_amount;
        }
        if let Some(fees) = self.fees {
            enrollment.fees = fees;
        }
        if let Some(stamp) = self.assessed {
            enrollment.assessed = Some(stamp);
        }
        if let Some(stamp) = self.approved {
            enrollment.approved = Some(stamp);
        }
        self.remarks.apply(&mut enrollment.remarks);
    }
}

/// Line item written alongside the enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineItemChange {
    /// Insert a line item.
    Added(EnrollmentSubject),
    /// Delete a line item.
    Removed {
        /// Line item to delete.
        line_item_id: EnrollmentSubjectId,
        /// Subject it referenced.
        subject_id: SubjectId,
    },
}

/// Payment row written alongside the enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentChange {
    /// Insert a pending payment.
    Created(PaymentTransaction),
    /// Mark a pending payment completed or rejected.
    Finalized {
        /// Payment to update.
        id: TransactionId,
        /// Completed or Rejected.
        status: PaymentStatus,
        /// Who processed it and when.
        processed: Stamp,
        /// Reviewer remarks.
        remarks: Option<String>,
    },
}

/// Everything a successful action writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The action performed.
    pub action: EnrollmentAction,
    /// Status before the action.
    pub from: EnrollmentStatus,
    /// Status after the action.
    pub to: EnrollmentStatus,
    /// Enrollment columns to write.
    pub update: EnrollmentUpdate,
    /// Line item to insert or delete.
    pub line_item: Option<LineItemChange>,
    /// Payment row to insert or update.
    pub payment: Option<PaymentChange>,
    /// Audit entry to record.
    pub audit: AuditEntry,
}

impl Transition {
    /// Applies the enrollment update in memory and returns the result.
    #[must_use]
    pub fn applied_to(&self, enrollment: &Enrollment) -> Enrollment {
        let mut next = enrollment.clone();
        self.update.apply_to(&mut next);
        next
    }
}
