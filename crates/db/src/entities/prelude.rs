//! Entity re-exports.

pub use super::activity_logs::Entity as ActivityLogs;
pub use super::enrollment_subjects::Entity as EnrollmentSubjects;
pub use super::enrollment_transactions::Entity as EnrollmentTransactions;
pub use super::enrollments::Entity as Enrollments;
pub use super::students::Entity as Students;
pub use super::subjects::Entity as Subjects;
