//! `SeaORM` entity definitions.

pub mod prelude;

pub mod activity_logs;
pub mod enrollment_subjects;
pub mod enrollment_transactions;
pub mod enrollments;
pub mod sea_orm_active_enums;
pub mod students;
pub mod subjects;
