//! Enrollment lifecycle management for Enrollo.
//!
//! This module implements the enrollment status state machine, the
//! role policy that gates each transition, and the fee ledger that keeps
//! `total_units` / `total_amount` consistent while subjects move in and out.
//!
//! # Modules
//!
//! - `types` - Domain types (EnrollmentStatus, Role, Enrollment, payments, audit)
//! - `error` - Enrollment-specific error types
//! - `policy` - Role allowed per action
//! - `fees` - Fee ledger recomputation and balance queries
//! - `update` - Explicit partial-update structs produced by transitions
//! - `service` - State transition logic

pub mod error;
pub mod fees;
pub mod policy;
pub mod service;
pub mod types;
pub mod update;

#[cfg(test)]
mod fees_props;
#[cfg(test)]
mod service_props;

pub use error::EnrollmentError;
pub use fees::{BalanceSummary, FeeLedger, LedgerTotals};
pub use policy::AccessPolicy;
pub use service::EnrollmentStateMachine;
pub use types::{
    AcademicTerm, Actor, AuditEntry, Enrollment, EnrollmentAction, EnrollmentStatus,
    EnrollmentSubject, FeeBreakdown, PaymentStatus, PaymentSubmission, PaymentTransaction, Role,
    ScheduleInfo, Semester, Stamp, StatusRequirement, Subject,
};
pub use update::{EnrollmentUpdate, FieldUpdate, LineItemChange, PaymentChange, Transition};
