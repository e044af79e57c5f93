//! `SeaORM` Entity for enrollments table.

use super::sea_orm_active_enums::{EnrollmentStatus, Semester};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "enrollments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub student_id: Uuid,
    pub school_year: String,
    pub semester: Semester,
    pub section_id: Option<Uuid>,
    pub status: EnrollmentStatus,
    pub total_units: i32,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub tuition_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub registration_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub library_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub lab_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub id_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub other_fees: Decimal,
    pub assessed_by: Option<Uuid>,
    pub assessed_at: Option<DateTimeWithTimeZone>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub remarks: Option<String>,
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::students::Entity",
        from = "Column::StudentId",
        to = "super::students::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Students,
    #[sea_orm(has_many = "super::enrollment_subjects::Entity")]
    EnrollmentSubjects,
    #[sea_orm(has_many = "super::enrollment_transactions::Entity")]
    EnrollmentTransactions,
}

impl Related<super::students::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl Related<super::enrollment_subjects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EnrollmentSubjects.def()
    }
}

impl Related<super::enrollment_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EnrollmentTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
