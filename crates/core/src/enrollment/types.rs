//! Enrollment domain types.
//!
//! This module defines the records the state machine reads and the
//! values it hands back to persistence: statuses, roles, the enrollment
//! aggregate with its line items and payments, and the audit entry.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use enrollo_shared::types::{
    EnrollmentId, EnrollmentSubjectId, SectionId, StudentId, SubjectId, TransactionId, UserId,
    check_money,
};

use crate::enrollment::error::EnrollmentError;
use crate::enrollment::fees::LedgerTotals;

/// Enrollment status in the registration pipeline.
///
/// The forward path is:
/// PendingAssessment → ForAdminApproval → ForSubjectSelection →
/// ForDeanApproval → ForPayment → PaymentVerification → Enrolled.
///
/// `Rejected` can be reached from any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Waiting for the registrar to assess fees.
    PendingAssessment,
    /// Assessment done, waiting for an admin to approve it.
    ForAdminApproval,
    /// The student may add and remove subjects.
    ForSubjectSelection,
    /// Subject load submitted, waiting for the dean.
    ForDeanApproval,
    /// Approved load, waiting for the student to pay.
    ForPayment,
    /// Payment submitted, waiting for verification.
    PaymentVerification,
    /// Fully registered (terminal).
    Enrolled,
    /// Rejected by an administrative override (terminal).
    Rejected,
}

impl EnrollmentStatus {
    /// All statuses in pipeline order, `Rejected` last.
    pub const ALL: [Self; 8] = [
        Self::PendingAssessment,
        Self::ForAdminApproval,
        Self::ForSubjectSelection,
        Self::ForDeanApproval,
        Self::ForPayment,
        Self::PaymentVerification,
        Self::Enrolled,
        Self::Rejected,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingAssessment => "pending_assessment",
            Self::ForAdminApproval => "for_admin_approval",
            Self::ForSubjectSelection => "for_subject_selection",
            Self::ForDeanApproval => "for_dean_approval",
            Self::ForPayment => "for_payment",
            Self::PaymentVerification => "payment_verification",
            Self::Enrolled => "enrolled",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status, accepting `for_payment`, `For Payment` or `FOR-PAYMENT`.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Enrolled | Self::Rejected)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which statuses an action may start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRequirement {
    /// Exactly this status.
    Exactly(EnrollmentStatus),
    /// Any status that is not terminal.
    NonTerminal,
}

impl StatusRequirement {
    /// Returns true if `status` satisfies the requirement.
    #[must_use]
    pub fn is_satisfied_by(&self, status: EnrollmentStatus) -> bool {
        match self {
            Self::Exactly(required) => *required == status,
            Self::NonTerminal => !status.is_terminal(),
        }
    }
}

impl fmt::Display for StatusRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(status) => write!(f, "{status}"),
            Self::NonTerminal => write!(f, "any non-terminal status"),
        }
    }
}

/// Role of the acting user, as supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Enrolling student.
    Student,
    /// Registrar staff.
    Registrar,
    /// School administrator.
    Admin,
    /// Academic dean.
    Dean,
    /// Cashier.
    Cashier,
}

impl Role {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "student" => Some(Self::Student),
            "registrar" => Some(Self::Registrar),
            "admin" => Some(Self::Admin),
            "dean" => Some(Self::Dean),
            "cashier" => Some(Self::Cashier),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Registrar => "registrar",
            Self::Admin => "admin",
            Self::Dean => "dean",
            Self::Cashier => "cashier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// User id from the identity provider.
    pub user_id: UserId,
    /// Role from the identity provider.
    pub role: Role,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Semester within a school year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    /// First semester.
    First,
    /// Second semester.
    Second,
    /// Summer term.
    Summer,
}

impl Semester {
    /// Parse a semester, accepting `first`, `1st` or `1`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "first" | "1st" | "1" => Some(Self::First),
            "second" | "2nd" | "2" => Some(Self::Second),
            "summer" => Some(Self::Summer),
            _ => None,
        }
    }

    /// Returns the string representation of the semester.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
            Self::Summer => "summer",
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The (school year, semester) an enrollment is scoped to.
///
/// Always passed explicitly; there is no ambient "current period".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcademicTerm {
    /// School year in `YYYY-YYYY` form, e.g. `2025-2026`.
    pub school_year: String,
    /// Semester within the school year.
    pub semester: Semester,
}

impl AcademicTerm {
    /// Creates a term after validating the school year format.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidTerm` unless `school_year` is two
    /// consecutive years joined by a dash.
    pub fn new(school_year: &str, semester: Semester) -> Result<Self, EnrollmentError> {
        let school_year = school_year.trim();
        let invalid = || EnrollmentError::InvalidTerm(school_year.to_string());

        let (start, end) = school_year.split_once('-').ok_or_else(invalid)?;
        if start.len() != 4 || end.len() != 4 {
            return Err(invalid());
        }
        let start: u16 = start.parse().map_err(|_| invalid())?;
        let end: u16 = end.parse().map_err(|_| invalid())?;
        if end != start + 1 {
            return Err(invalid());
        }

        Ok(Self {
            school_year: school_year.to_string(),
            semester,
        })
    }
}

impl fmt::Display for AcademicTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.school_year, self.semester)
    }
}

/// Registrar-determined base fees, excluding per-unit subject charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Tuition fee.
    pub tuition: Decimal,
    /// Registration fee.
    pub registration: Decimal,
    /// Library fee.
    pub library: Decimal,
    /// Laboratory fee.
    pub lab: Decimal,
    /// ID card fee.
    pub id_fee: Decimal,
    /// Miscellaneous fees.
    pub others: Decimal,
}

impl FeeBreakdown {
    /// Returns `(name, amount)` for each component.
    #[must_use]
    pub fn components(&self) -> [(&'static str, Decimal); 6] {
        [
            ("tuition", self.tuition),
            ("registration", self.registration),
            ("library", self.library),
            ("lab", self.lab),
            ("id_fee", self.id_fee),
            ("others", self.others),
        ]
    }

    /// Sum of all components.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.components().iter().map(|(_, amount)| *amount).sum()
    }

    /// Checks every component and returns the breakdown at money scale.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::NegativeFee` naming the first negative
    /// component, or `EnrollmentError::InvalidAmount` for a component a
    /// money column cannot hold.
    pub fn validated(&self) -> Result<Self, EnrollmentError> {
        if let Some((component, amount)) = self
            .components()
            .into_iter()
            .find(|(_, amount)| amount.is_sign_negative() && !amount.is_zero())
        {
            return Err(EnrollmentError::NegativeFee { component, amount });
        }

        let money = |field: &'static str, amount: Decimal| {
            check_money(amount).map_err(|reason| EnrollmentError::InvalidAmount { field, reason })
        };
        Ok(Self {
            tuition: money("tuition", self.tuition)?,
            registration: money("registration", self.registration)?,
            library: money("library", self.library)?,
            lab: money("lab", self.lab)?,
            id_fee: money("id_fee", self.id_fee)?,
            others: money("others", self.others)?,
        })
    }
}

/// Who did something and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    /// Acting user.
    pub by: UserId,
    /// When it happened.
    pub at: DateTime<Utc>,
}

impl Stamp {
    /// Stamps `by` at the current time.
    #[must_use]
    pub fn now(by: UserId) -> Self {
        Self { by, at: Utc::now() }
    }
}

/// One student's registration record for a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Enrollment id.
    pub id: EnrollmentId,
    /// Owning student.
    pub student_id: StudentId,
    /// Term the enrollment belongs to.
    pub term: AcademicTerm,
    /// Optional section assignment.
    pub section_id: Option<SectionId>,
    /// Current status.
    pub status: EnrollmentStatus,
    /// Sum of units over the line items.
    pub total_units: u32,
    /// Amount due: assessment subtotal plus subject fees.
    pub total_amount: Decimal,
    /// Last assessed fee breakdown.
    pub fees: FeeBreakdown,
    /// Registrar assessment stamp.
    pub assessed: Option<Stamp>,
    /// Admin approval stamp.
    pub approved: Option<Stamp>,
    /// Free-form remarks from the last reviewer.
    pub remarks: Option<String>,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// Current ledger totals.
    #[must_use]
    pub fn totals(&self) -> LedgerTotals {
        LedgerTotals {
            total_units: self.total_units,
            total_amount: self.total_amount,
        }
    }

    /// Returns true once the registrar has assessed fees.
    #[must_use]
    pub fn is_assessed(&self) -> bool {
        self.assessed.is_some()
    }
}

/// Catalog subject record (read-only to the core).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject id.
    pub id: SubjectId,
    /// Catalog code, e.g. `CS101`.
    pub code: String,
    /// Descriptive name.
    pub name: String,
    /// Unit count.
    pub units: u32,
}

/// Schedule details attached to a line item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScheduleInfo {
    /// Meeting schedule, e.g. `MWF 09:00-10:00`.
    pub schedule: Option<String>,
    /// Room.
    pub room: Option<String>,
    /// Instructor name.
    pub instructor: Option<String>,
}

/// A subject on an enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentSubject {
    /// Line item id.
    pub id: EnrollmentSubjectId,
    /// Owning enrollment.
    pub enrollment_id: EnrollmentId,
    /// Referenced subject.
    pub subject_id: SubjectId,
    /// Units captured when the subject was added.
    pub units: u32,
    /// Schedule details.
    pub schedule: ScheduleInfo,
    /// Final grade, filled in outside this system.
    pub grade: Option<String>,
}

/// Payment transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Submitted, not yet checked.
    Pending,
    /// Verified by a cashier or registrar.
    Completed,
    /// Refused by a cashier or registrar.
    Rejected,
}

impl PaymentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment details submitted by a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSubmission {
    /// Payment method, e.g. `cash` or `bank_transfer`.
    pub method: String,
    /// Bank or gateway reference number.
    pub reference_number: Option<String>,
    /// Amount paid.
    pub amount: Decimal,
    /// Path of the uploaded receipt in document storage.
    pub receipt_ref: Option<String>,
}

/// Payment record against an enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    /// Transaction id.
    pub id: TransactionId,
    /// Owning enrollment.
    pub enrollment_id: EnrollmentId,
    /// Amount paid.
    pub amount: Decimal,
    /// Payment method.
    pub method: String,
    /// Bank or gateway reference number.
    pub reference_number: Option<String>,
    /// Path of the uploaded receipt.
    pub receipt_ref: Option<String>,
    /// Processing status.
    pub status: PaymentStatus,
    /// Who verified or rejected the payment.
    pub processed: Option<Stamp>,
    /// Reviewer remarks.
    pub remarks: Option<String>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// Actions that can be performed on an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentAction {
    /// Student requests enrollment.
    Create,
    /// Registrar assesses fees.
    Assess,
    /// Admin approves the assessment.
    ApproveAssessment,
    /// Student adds a subject.
    AddSubject,
    /// Student removes a subject.
    RemoveSubject,
    /// Student submits the subject load.
    SubmitSubjects,
    /// Dean approves the subject load.
    ApproveSubjects,
    /// Student submits a payment.
    SubmitPayment,
    /// Cashier or registrar verifies a payment.
    VerifyPayment,
    /// Cashier or registrar refuses a payment.
    RejectPayment,
    /// Administrative rejection.
    Reject,
}

impl EnrollmentAction {
    /// Action name recorded in the activity log.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create_enrollment",
            Self::Assess => "assess_enrollment",
            Self::ApproveAssessment => "approve_assessment",
            Self::AddSubject => "add_subject",
            Self::RemoveSubject => "remove_subject",
            Self::SubmitSubjects => "submit_subjects",
            Self::ApproveSubjects => "approve_subjects",
            Self::SubmitPayment => "submit_payment",
            Self::VerifyPayment => "verify_payment",
            Self::RejectPayment => "reject_payment",
            Self::Reject => "reject_enrollment",
        }
    }

    /// Statuses the action may start from; `None` for `Create`.
    #[must_use]
    pub fn requirement(&self) -> Option<StatusRequirement> {
        use EnrollmentStatus as S;
        let status = match self {
            Self::Create => return None,
            Self::Reject => return Some(StatusRequirement::NonTerminal),
            Self::Assess => S::PendingAssessment,
            Self::ApproveAssessment => S::ForAdminApproval,
            Self::AddSubject | Self::RemoveSubject | Self::SubmitSubjects => {
                S::ForSubjectSelection
            }
            Self::ApproveSubjects => S::ForDeanApproval,
            Self::SubmitPayment => S::ForPayment,
            Self::VerifyPayment | Self::RejectPayment => S::PaymentVerification,
        };
        Some(StatusRequirement::Exactly(status))
    }

    /// Status after the action succeeds from `from`.
    #[must_use]
    pub fn target(&self, from: EnrollmentStatus) -> EnrollmentStatus {
        use EnrollmentStatus as S;
        match self {
            Self::Create => S::PendingAssessment,
            Self::Assess => S::ForAdminApproval,
            Self::ApproveAssessment => S::ForSubjectSelection,
            Self::AddSubject | Self::RemoveSubject => from,
            Self::SubmitSubjects => S::ForDeanApproval,
            Self::ApproveSubjects => S::ForPayment,
            Self::SubmitPayment => S::PaymentVerification,
            Self::VerifyPayment => S::Enrolled,
            Self::RejectPayment => S::ForPayment,
            Self::Reject => S::Rejected,
        }
    }
}

impl fmt::Display for EnrollmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Activity log record emitted once per successful operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Acting user.
    pub actor_id: UserId,
    /// Action performed.
    pub action: EnrollmentAction,
    /// Always `"enrollment"`.
    pub entity_type: &'static str,
    /// Affected enrollment.
    pub entity_id: EnrollmentId,
    /// Human-readable description.
    pub description: String,
    /// When the action happened.
    pub occurred_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Entity type recorded for every enrollment audit entry.
    pub const ENTITY_TYPE: &'static str = "enrollment";

    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(
        actor_id: UserId,
        action: EnrollmentAction,
        entity_id: EnrollmentId,
        description: impl Into<String>,
    ) -> Self {
        Self {
            actor_id,
            action,
            entity_type: Self::ENTITY_TYPE,
            entity_id,
            description: description.into(),
            occurred_at: Utc::now(),
        }
    }
}
