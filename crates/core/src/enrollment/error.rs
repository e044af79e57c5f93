//! Enrollment error types.
//!
//! Every state machine operation and every repository call returns
//! `EnrollmentError`. Variants carry enough context to build an API
//! response without another lookup.

use rust_decimal::Decimal;
use thiserror::Error;

use enrollo_shared::types::{EnrollmentId, MoneyError, StudentId, SubjectId, TransactionId};

use crate::enrollment::types::{EnrollmentAction, EnrollmentStatus, Role, StatusRequirement};

/// Errors that can occur during enrollment operations.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// Enrollment id does not resolve.
    #[error("Enrollment {0} not found")]
    NotFound(EnrollmentId),

    /// Subject id does not resolve, or is not on the enrollment.
    #[error("Subject {0} not found")]
    SubjectNotFound(SubjectId),

    /// Payment id does not resolve, or belongs to another enrollment.
    #[error("Payment {0} not found")]
    PaymentNotFound(TransactionId),

    /// Student id does not resolve.
    #[error("Student {0} not found")]
    StudentNotFound(StudentId),

    /// The enrollment is not in a status the action accepts.
    #[error("Invalid status transition: enrollment is {current}, expected {expected}")]
    InvalidTransition {
        /// The current status.
        current: EnrollmentStatus,
        /// The statuses the action accepts.
        expected: StatusRequirement,
    },

    /// The caller's role may not perform the action.
    #[error("Role {role} is not allowed to {action}")]
    Unauthorized {
        /// The caller's role.
        role: Role,
        /// The attempted action.
        action: EnrollmentAction,
    },

    /// The subject is already on the enrollment.
    #[error("Subject {0} is already on this enrollment")]
    DuplicateSubject(SubjectId),

    /// The student already has an enrollment for the term.
    #[error("Student already has an enrollment for {school_year} {semester}")]
    AlreadyExists {
        /// School year of the existing enrollment.
        school_year: String,
        /// Semester of the existing enrollment.
        semester: String,
    },

    /// Subjects were submitted with none selected.
    #[error("At least one subject must be selected")]
    EmptySelection,

    /// Remarks are mandatory for the action.
    #[error("Remarks are required")]
    RemarksRequired,

    /// A fee component is negative.
    #[error("Fee component {component} cannot be negative: {amount}")]
    NegativeFee {
        /// Name of the offending component.
        component: &'static str,
        /// The negative amount.
        amount: Decimal,
    },

    /// An amount does not fit a money column.
    #[error("Invalid {field}: {reason}")]
    InvalidAmount {
        /// Name of the offending amount.
        field: &'static str,
        /// Why it cannot be stored.
        reason: MoneyError,
    },

    /// Payment amount is zero or negative.
    #[error("Payment amount must be positive, got {0}")]
    InvalidPaymentAmount(Decimal),

    /// Payment method is blank.
    #[error("Payment method is required")]
    PaymentMethodRequired,

    /// The payment was already verified or rejected.
    #[error("Payment {0} has already been processed")]
    PaymentAlreadyProcessed(TransactionId),

    /// School year is malformed.
    #[error("Invalid school year {0:?}, expected e.g. 2025-2026")]
    InvalidTerm(String),

    /// The enrollment changed underneath the operation.
    #[error("Enrollment {0} was modified concurrently")]
    ConcurrencyConflict(EnrollmentId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl EnrollmentError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_)
            | Self::SubjectNotFound(_)
            | Self::PaymentNotFound(_)
            | Self::StudentNotFound(_) => 404,

            Self::InvalidTransition { .. }
            | Self::EmptySelection
            | Self::RemarksRequired
            | Self::NegativeFee { .. }
            | Self::InvalidAmount { .. }
            | Self::InvalidPaymentAmount(_)
            | Self::PaymentMethodRequired
            | Self::InvalidTerm(_) => 400,

            Self::Unauthorized { .. } => 403,

            Self::DuplicateSubject(_)
            | Self::AlreadyExists { .. }
            | Self::PaymentAlreadyProcessed(_)
            | Self::ConcurrencyConflict(_) => 409,

            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ENROLLMENT_NOT_FOUND",
            Self::SubjectNotFound(_) => "SUBJECT_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::StudentNotFound(_) => "STUDENT_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::DuplicateSubject(_) => "DUPLICATE_SUBJECT",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::EmptySelection => "EMPTY_SELECTION",
            Self::RemarksRequired => "REMARKS_REQUIRED",
            Self::NegativeFee { .. } => "NEGATIVE_FEE",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InvalidPaymentAmount(_) => "INVALID_PAYMENT_AMOUNT",
            Self::PaymentMethodRequired => "PAYMENT_METHOD_REQUIRED",
            Self::PaymentAlreadyProcessed(_) => "PAYMENT_ALREADY_PROCESSED",
            Self::InvalidTerm(_) => "INVALID_TERM",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true if repeating the operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}
