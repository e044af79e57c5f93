//! `SeaORM` active enums mapped to Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "enrollment_status")]
pub enum EnrollmentStatus {
    #[sea_orm(string_value = "pending_assessment")]
    PendingAssessment,
    #[sea_orm(string_value = "for_admin_approval")]
    ForAdminApproval,
    #[sea_orm(string_value = "for_subject_selection")]
    ForSubjectSelection,
    #[sea_orm(string_value = "for_dean_approval")]
    ForDeanApproval,
    #[sea_orm(string_value = "for_payment")]
    ForPayment,
    #[sea_orm(string_value = "payment_verification")]
    PaymentVerification,
    #[sea_orm(string_value = "enrolled")]
    Enrolled,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_status")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "semester")]
pub enum Semester {
    #[sea_orm(string_value = "first")]
    First,
    #[sea_orm(string_value = "second")]
    Second,
    #[sea_orm(string_value = "summer")]
    Summer,
}
