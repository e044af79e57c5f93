//! Enrollment state machine.
//!
//! Each operation validates the current status, then the caller's role,
//! then its own inputs, and returns a [`Transition`] describing what to
//! persist. Nothing here touches storage; the caller is responsible for
//! loading the enrollment under a lock and writing the transition back
//! atomically.

use chrono::Utc;
use rust_decimal::Decimal;

use enrollo_shared::types::{
    EnrollmentId, EnrollmentSubjectId, SectionId, StudentId, SubjectId, TransactionId,
    check_money, round_money,
};

use crate::enrollment::error::EnrollmentError;
use crate::enrollment::fees::{FeeLedger, LedgerTotals};
use crate::enrollment::policy::AccessPolicy;
use crate::enrollment::types::{
    AcademicTerm, Actor, AuditEntry, Enrollment, EnrollmentAction, EnrollmentStatus,
    EnrollmentSubject, FeeBreakdown, PaymentStatus, PaymentSubmission, PaymentTransaction,
    ScheduleInfo, Stamp, Subject,
};
use crate::enrollment::update::{
    EnrollmentUpdate, FieldUpdate, LineItemChange, PaymentChange, Transition,
};

/// Validates and computes enrollment transitions.
#[derive(Debug, Clone, Copy)]
pub struct EnrollmentStateMachine {
    ledger: FeeLedger,
}

impl EnrollmentStateMachine {
    /// Creates a state machine that prices subjects with `ledger`.
    #[must_use]
    pub const fn new(ledger: FeeLedger) -> Self {
        Self { ledger }
    }

    /// Checks that `action` may run from `current` for `actor`.
    ///
    /// The status is checked before the role.
    ///
    /// # Returns
    /// * `Ok(target)` - the status the enrollment moves to
    /// * `Err(EnrollmentError::InvalidTransition)` - wrong status
    /// * `Err(EnrollmentError::Unauthorized)` - wrong role
    pub fn check(
        action: EnrollmentAction,
        current: EnrollmentStatus,
        actor: &Actor,
    ) -> Result<EnrollmentStatus, EnrollmentError> {
        if let Some(expected) = action.requirement()
            && !expected.is_satisfied_by(current)
        {
            return Err(EnrollmentError::InvalidTransition { current, expected });
        }
        AccessPolicy::authorize(action, actor.role)?;
        Ok(action.target(current))
    }

    /// Returns true if `action` may run from `current`, ignoring roles.
    #[must_use]
    pub fn can_apply(action: EnrollmentAction, current: EnrollmentStatus) -> bool {
        action
            .requirement()
            .is_none_or(|required| required.is_satisfied_by(current))
    }

    /// Start a new enrollment for `student_id` in `term`.
    ///
    /// The new enrollment has no subjects, no fees and a zero amount.
    ///
    /// # Arguments
    /// * `actor` - The requesting student
    /// * `student_id` - The student record the enrollment belongs to
    /// * `term` - The school year and semester
    /// * `section_id` - Optional class section
    ///
    /// # Returns
    /// * `Ok((enrollment, audit))` - the new `PendingAssessment` enrollment at version 1
    /// * `Err(EnrollmentError::Unauthorized)` if the actor is not a student
    pub fn create(
        &self,
        actor: &Actor,
        student_id: StudentId,
        term: AcademicTerm,
        section_id: Option<SectionId>,
    ) -> Result<(Enrollment, AuditEntry), EnrollmentError> {
        AccessPolicy::authorize(EnrollmentAction::Create, actor.role)?;

        let now = Utc::now();
        let enrollment = Enrollment {
            id: EnrollmentId::new(),
            student_id,
            section_id,
            status: EnrollmentStatus::PendingAssessment,
            total_units: 0,
            total_amount: round_money(Decimal::ZERO),
            fees: FeeBreakdown::default(),
            assessed: None,
            approved: None,
            remarks: None,
            version: 1,
            created_at: now,
            updated_at: now,
            term,
        };
        let audit = AuditEntry::new(
            actor.user_id,
            EnrollmentAction::Create,
            enrollment.id,
            format!("Enrollment requested for {}", enrollment.term),
        );

        Ok((enrollment, audit))
    }

    /// Registrar assessment of base fees.
    ///
    /// Sets the fee breakdown and makes `total_amount` the fee subtotal
    /// plus the fees for any subjects already on the enrollment.
    ///
    /// # Arguments
    /// * `enrollment` - The enrollment as loaded under lock
    /// * `actor` - The assessing registrar
    /// * `fees` - The base fee breakdown
    ///
    /// # Returns
    /// * `Ok(Transition)` to `ForAdminApproval`
    /// * `Err(EnrollmentError::InvalidTransition)` if not in `PendingAssessment`
    /// * `Err(EnrollmentError::NegativeFee)` if a component is negative
    /// * `Err(EnrollmentError::InvalidAmount)` if a component or the total does
    ///   not fit a money column
    pub fn assess(
        &self,
        enrollment: &Enrollment,
        actor: &Actor,
        fees: FeeBreakdown,
    ) -> Result<Transition, EnrollmentError> {
        let to = Self::check(EnrollmentAction::Assess, enrollment.status, actor)?;
        let fees = fees.validated()?;

        let totals = storable(self.ledger.assess(enrollment.total_units, &fees))?;
        let description = format!(
            "Assessed fees: subtotal {}, total {}",
            fees.subtotal(),
            totals.total_amount
        );
        let update = EnrollmentUpdate {
            status: Some(to),
            totals: Some(totals),
            fees: Some(fees),
            assessed: Some(Stamp::now(actor.user_id)),
            ..EnrollmentUpdate::default()
        };

        Ok(build(EnrollmentAction::Assess, enrollment, actor, to, update, description))
    }

    /// Admin approval of the assessment; opens subject selection.
    ///
    /// # Arguments
    /// * `enrollment` - The enrollment as loaded under lock
    /// * `actor` - The approving admin
    /// * `remarks` - Optional remarks; blank clears existing remarks
    ///
    /// # Returns
    /// * `Ok(Transition)` to `ForSubjectSelection`
    /// * `Err(EnrollmentError::InvalidTransition)` if not in `ForAdminApproval`
    pub fn approve_assessment(
        &self,
        enrollment: &Enrollment,
        actor: &Actor,
        remarks: Option<&str>,
    ) -> Result<Transition, EnrollmentError> {
        let to = Self::check(EnrollmentAction::ApproveAssessment, enrollment.status, actor)?;

        let update = EnrollmentUpdate {
            status: Some(to),
            approved: Some(Stamp::now(actor.user_id)),
            remarks: FieldUpdate::from_remarks(remarks),
            ..EnrollmentUpdate::default()
        };

        Ok(build(
            EnrollmentAction::ApproveAssessment,
            enrollment,
            actor,
            to,
            update,
            "Assessment approved",
        ))
    }

    /// Add `subject` to the enrollment.
    ///
    /// # Arguments
    /// * `enrollment` - The enrollment as loaded under lock
    /// * `current` - Its line items, loaded under the same lock
    /// * `actor` - The selecting student
    /// * `subject` - The catalog subject to add
    /// * `schedule` - Schedule, room and instructor for the line item
    ///
    /// # Returns
    /// * `Ok(Transition)` carrying the new line item; status is unchanged
    /// * `Err(EnrollmentError::InvalidTransition)` if not in `ForSubjectSelection`
    /// * `Err(EnrollmentError::DuplicateSubject)` if the subject is already present
    /// * `Err(EnrollmentError::InvalidAmount)` if the new total does not fit
    pub fn add_subject(
        &self,
        enrollment: &Enrollment,
        current: &[EnrollmentSubject],
        actor: &Actor,
        subject: &Subject,
        schedule: ScheduleInfo,
    ) -> Result<Transition, EnrollmentError> {
        let to = Self::check(EnrollmentAction::AddSubject, enrollment.status, actor)?;
        if current.iter().any(|item| item.subject_id == subject.id) {
            return Err(EnrollmentError::DuplicateSubject(subject.id));
        }

        let totals = storable(self.ledger.add_subject(
            enrollment.totals(),
            enrollment.is_assessed(),
            subject.units,
        ))?;
        let line_item = EnrollmentSubject {
            id: EnrollmentSubjectId::new(),
            enrollment_id: enrollment.id,
            subject_id: subject.id,
            units: subject.units,
            schedule,
            grade: None,
        };
        let update = EnrollmentUpdate {
            totals: Some(totals),
            ..EnrollmentUpdate::default()
        };
        let description = format!(
            "Added subject {} ({} units), total {}",
            subject.code, subject.units, totals.total_amount
        );

        let mut transition = build(
            EnrollmentAction::AddSubject,
            enrollment,
            actor,
            to,
            update,
            description,
        );
        transition.line_item = Some(LineItemChange::Added(line_item));
        Ok(transition)
    }

    /// Remove the line item for `subject_id`.
    ///
    /// # Arguments
    /// * `enrollment` - The enrollment as loaded under lock
    /// * `current` - Its line items, loaded under the same lock
    /// * `actor` - The selecting student
    /// * `subject_id` - The subject to drop
    ///
    /// # Returns
    /// * `Ok(Transition)` carrying the removed line item; status is unchanged
    /// * `Err(EnrollmentError::InvalidTransition)` if not in `ForSubjectSelection`
    /// * `Err(EnrollmentError::SubjectNotFound)` if the subject is not on the enrollment
    pub fn remove_subject(
        &self,
        enrollment: &Enrollment,
        current: &[EnrollmentSubject],
        actor: &Actor,
        subject_id: SubjectId,
    ) -> Result<Transition, EnrollmentError> {
        let to = Self::check(EnrollmentAction::RemoveSubject, enrollment.status, actor)?;
        let item = current
            .iter()
            .find(|item| item.subject_id == subject_id)
            .ok_or(EnrollmentError::SubjectNotFound(subject_id))?;

        let totals =
            self.ledger
                .remove_subject(enrollment.totals(), enrollment.is_assessed(), item.units);
        let update = EnrollmentUpdate {
            totals: Some(totals),
            ..EnrollmentUpdate::default()
        };
        let description = format!(
            "Removed subject {subject_id} ({} units), total {}",
            item.units, totals.total_amount
        );

        let mut transition = build(
            EnrollmentAction::RemoveSubject,
            enrollment,
            actor,
            to,
            update,
            description,
        );
        transition.line_item = Some(LineItemChange::Removed {
            line_item_id: item.id,
            subject_id,
        });
        Ok(transition)
    }

    /// Submit the subject load for dean approval.
    ///
    /// Totals are recomputed from the line items, which are the source of
    /// truth for `total_units`.
    ///
    /// # Arguments
    /// * `enrollment` - The enrollment as loaded under lock
    /// * `current` - Its line items, loaded under the same lock
    /// * `actor` - The selecting student
    ///
    /// # Returns
    /// * `Ok(Transition)` to `ForDeanApproval`
    /// * `Err(EnrollmentError::InvalidTransition)` if not in `ForSubjectSelection`
    /// * `Err(EnrollmentError::EmptySelection)` if no subject is selected
    pub fn submit_subjects(
        &self,
        enrollment: &Enrollment,
        current: &[EnrollmentSubject],
        actor: &Actor,
    ) -> Result<Transition, EnrollmentError> {
        let to = Self::check(EnrollmentAction::SubmitSubjects, enrollment.status, actor)?;
        if current.is_empty() {
            return Err(EnrollmentError::EmptySelection);
        }

        let units = current
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.units));
        let totals = storable(self.ledger.recompute(
            enrollment.totals(),
            enrollment.is_assessed(),
            units,
        ))?;
        let update = EnrollmentUpdate {
            status: Some(to),
            totals: Some(totals),
            ..EnrollmentUpdate::default()
        };
        let description = format!(
            "Submitted {} subjects ({} units), total {}",
            current.len(),
            totals.total_units,
            totals.total_amount
        );

        Ok(build(
            EnrollmentAction::SubmitSubjects,
            enrollment,
            actor,
            to,
            update,
            description,
        ))
    }

    /// Dean approval of the subject load.
    ///
    /// # Arguments
    /// * `enrollment` - The enrollment as loaded under lock
    /// * `actor` - The approving dean
    /// * `remarks` - Optional remarks; blank clears existing remarks
    ///
    /// # Returns
    /// * `Ok(Transition)` to `ForPayment`
    /// * `Err(EnrollmentError::InvalidTransition)` if not in `ForDeanApproval`
    pub fn approve_subjects(
        &self,
        enrollment: &Enrollment,
        actor: &Actor,
        remarks: Option<&str>,
    ) -> Result<Transition, EnrollmentError> {
        let to = Self::check(EnrollmentAction::ApproveSubjects, enrollment.status, actor)?;

        let update = EnrollmentUpdate {
            status: Some(to),
            remarks: FieldUpdate::from_remarks(remarks),
            ..EnrollmentUpdate::default()
        };

        Ok(build(
            EnrollmentAction::ApproveSubjects,
            enrollment,
            actor,
            to,
            update,
            "Subjects approved",
        ))
    }

    /// Record a student payment for verification.
    ///
    /// # Arguments
    /// * `enrollment` - The enrollment as loaded under lock
    /// * `actor` - The paying student
    /// * `submission` - Method, amount and references of the payment
    ///
    /// # Returns
    /// * `Ok(Transition)` to `PaymentVerification` carrying a pending payment
    /// * `Err(EnrollmentError::InvalidTransition)` if not in `ForPayment`
    /// * `Err(EnrollmentError::InvalidPaymentAmount)` if the amount is not positive
    /// * `Err(EnrollmentError::InvalidAmount)` if the amount does not fit a money column
    /// * `Err(EnrollmentError::PaymentMethodRequired)` if the method is blank
    pub fn submit_payment(
        &self,
        enrollment: &Enrollment,
        actor: &Actor,
        submission: PaymentSubmission,
    ) -> Result<Transition, EnrollmentError> {
        let to = Self::check(EnrollmentAction::SubmitPayment, enrollment.status, actor)?;
        if submission.amount <= Decimal::ZERO {
            return Err(EnrollmentError::InvalidPaymentAmount(submission.amount));
        }
        let amount = check_money(submission.amount).map_err(|reason| {
            EnrollmentError::InvalidAmount {
                field: "amount",
                reason,
            }
        })?;
        let method = submission.method.trim();
        if method.is_empty() {
            return Err(EnrollmentError::PaymentMethodRequired);
        }

        let payment = PaymentTransaction {
            id: TransactionId::new(),
            enrollment_id: enrollment.id,
            amount,
            method: method.to_string(),
            reference_number: non_blank(submission.reference_number.as_deref()),
            receipt_ref: non_blank(submission.receipt_ref.as_deref()),
            status: PaymentStatus::Pending,
            processed: None,
            remarks: None,
            created_at: Utc::now(),
        };
        let update = EnrollmentUpdate {
            status: Some(to),
            ..EnrollmentUpdate::default()
        };
        let description = format!("Submitted {} payment of {}", payment.method, payment.amount);

        let mut transition = build(
            EnrollmentAction::SubmitPayment,
            enrollment,
            actor,
            to,
            update,
            description,
        );
        transition.payment = Some(PaymentChange::Created(payment));
        Ok(transition)
    }

    /// Verify `payment` and complete the enrollment.
    ///
    /// # Arguments
    /// * `enrollment` - The enrollment as loaded under lock
    /// * `payment` - The payment being verified
    /// * `actor` - The verifying registrar or cashier
    /// * `remarks` - Optional remarks stored on the payment
    ///
    /// # Returns
    /// * `Ok(Transition)` to `Enrolled`, marking the payment completed
    /// * `Err(EnrollmentError::InvalidTransition)` if not in `PaymentVerification`
    /// * `Err(EnrollmentError::PaymentNotFound)` if the payment belongs elsewhere
    /// * `Err(EnrollmentError::PaymentAlreadyProcessed)` if it is not pending
    pub fn verify_payment(
        &self,
        enrollment: &Enrollment,
        payment: &PaymentTransaction,
        actor: &Actor,
        remarks: Option<&str>,
    ) -> Result<Transition, EnrollmentError> {
        let to = Self::check(EnrollmentAction::VerifyPayment, enrollment.status, actor)?;
        ensure_pending(enrollment, payment)?;

        let update = EnrollmentUpdate {
            status: Some(to),
            ..EnrollmentUpdate::default()
        };
        let description = format!("Verified payment {} of {}", payment.id, payment.amount);

        let mut transition = build(
            EnrollmentAction::VerifyPayment,
            enrollment,
            actor,
            to,
            update,
            description,
        );
        transition.payment = Some(PaymentChange::Finalized {
            id: payment.id,
            status: PaymentStatus::Completed,
            processed: Stamp::now(actor.user_id),
            remarks: non_blank(remarks),
        });
        Ok(transition)
    }

    /// Refuse `payment` and send the enrollment back to `ForPayment`.
    ///
    /// # Arguments
    /// * `enrollment` - The enrollment as loaded under lock
    /// * `payment` - The payment being refused
    /// * `actor` - The registrar or cashier
    /// * `remarks` - Reason for refusal (required)
    ///
    /// # Returns
    /// * `Ok(Transition)` to `ForPayment`, marking the payment rejected
    /// * `Err(EnrollmentError::InvalidTransition)` if not in `PaymentVerification`
    /// * `Err(EnrollmentError::RemarksRequired)` if remarks are blank
    /// * `Err(EnrollmentError::PaymentNotFound)` or `PaymentAlreadyProcessed`
    pub fn reject_payment(
        &self,
        enrollment: &Enrollment,
        payment: &PaymentTransaction,
        actor: &Actor,
        remarks: &str,
    ) -> Result<Transition, EnrollmentError> {
        let to = Self::check(EnrollmentAction::RejectPayment, enrollment.status, actor)?;
        let remarks = required_remarks(remarks)?;
        ensure_pending(enrollment, payment)?;

        let update = EnrollmentUpdate {
            status: Some(to),
            remarks: FieldUpdate::Set(remarks.clone()),
            ..EnrollmentUpdate::default()
        };
        let description = format!("Rejected payment {}: {remarks}", payment.id);

        let mut transition = build(
            EnrollmentAction::RejectPayment,
            enrollment,
            actor,
            to,
            update,
            description,
        );
        transition.payment = Some(PaymentChange::Finalized {
            id: payment.id,
            status: PaymentStatus::Rejected,
            processed: Stamp::now(actor.user_id),
            remarks: Some(remarks),
        });
        Ok(transition)
    }

    /// Administrative rejection from any non-terminal status.
    ///
    /// # Arguments
    /// * `enrollment` - The enrollment as loaded under lock
    /// * `actor` - The rejecting admin or registrar
    /// * `remarks` - Reason for rejection (required)
    ///
    /// # Returns
    /// * `Ok(Transition)` to `Rejected`
    /// * `Err(EnrollmentError::InvalidTransition)` if already terminal
    /// * `Err(EnrollmentError::RemarksRequired)` if remarks are blank
    pub fn reject(
        &self,
        enrollment: &Enrollment,
        actor: &Actor,
        remarks: &str,
    ) -> Result<Transition, EnrollmentError> {
        let to = Self::check(EnrollmentAction::Reject, enrollment.status, actor)?;
        let remarks = required_remarks(remarks)?;

        let description = format!("Rejected from {}: {remarks}", enrollment.status);
        let update = EnrollmentUpdate {
            status: Some(to),
            remarks: FieldUpdate::Set(remarks),
            ..EnrollmentUpdate::default()
        };

        Ok(build(EnrollmentAction::Reject, enrollment, actor, to, update, description))
    }
}

fn build(
    action: EnrollmentAction,
    enrollment: &Enrollment,
    actor: &Actor,
    to: EnrollmentStatus,
    update: EnrollmentUpdate,
    description: impl Into<String>,
) -> Transition {
    Transition {
        action,
        from: enrollment.status,
        to,
        update,
        line_item: None,
        payment: None,
        audit: AuditEntry::new(actor.user_id, action, enrollment.id, description),
    }
}

fn storable(totals: LedgerTotals) -> Result<LedgerTotals, EnrollmentError> {
    check_money(totals.total_amount).map_err(|reason| EnrollmentError::InvalidAmount {
        field: "total_amount",
        reason,
    })?;
    Ok(totals)
}

fn ensure_pending(
    enrollment: &Enrollment,
    payment: &PaymentTransaction,
) -> Result<(), EnrollmentError> {
    if payment.enrollment_id != enrollment.id {
        return Err(EnrollmentError::PaymentNotFound(payment.id));
    }
    if payment.status != PaymentStatus::Pending {
        return Err(EnrollmentError::PaymentAlreadyProcessed(payment.id));
    }
    Ok(())
}

fn required_remarks(remarks: &str) -> Result<String, EnrollmentError> {
    non_blank(Some(remarks)).ok_or(EnrollmentError::RemarksRequired)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
