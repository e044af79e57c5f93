//! Initial database migration.
//!
//! Creates the enum types, the student and subject catalog, enrollments
//! with their line items and payments, and the activity log.
//! Deleting a student cascades to its enrollments, and deleting an
//! enrollment cascades to its line items and payments.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;

        // Catalog
        db.execute_unprepared(STUDENTS_SQL).await?;
        db.execute_unprepared(SUBJECTS_SQL).await?;

        // Enrollment aggregate
        db.execute_unprepared(ENROLLMENTS_SQL).await?;
        db.execute_unprepared(ENROLLMENT_SUBJECTS_SQL).await?;
        db.execute_unprepared(ENROLLMENT_TRANSACTIONS_SQL).await?;

        db.execute_unprepared(ACTIVITY_LOGS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE enrollment_status AS ENUM (
    'pending_assessment',
    'for_admin_approval',
    'for_subject_selection',
    'for_dean_approval',
    'for_payment',
    'payment_verification',
    'enrolled',
    'rejected'
);

CREATE TYPE payment_status AS ENUM ('pending', 'completed', 'rejected');

CREATE TYPE semester AS ENUM ('first', 'second', 'summer');
";

const STUDENTS_SQL: &str = r"
CREATE TABLE students (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID,
    student_number VARCHAR(50) NOT NULL UNIQUE,
    full_name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_students_user ON students(user_id) WHERE user_id IS NOT NULL;
";

const SUBJECTS_SQL: &str = r"
CREATE TABLE subjects (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    code VARCHAR(50) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    units INTEGER NOT NULL CHECK (units >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const ENROLLMENTS_SQL: &str = r"
CREATE TABLE enrollments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    student_id UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
    school_year VARCHAR(9) NOT NULL,
    semester semester NOT NULL,
    section_id UUID,
    status enrollment_status NOT NULL DEFAULT 'pending_assessment',

    total_units INTEGER NOT NULL DEFAULT 0 CHECK (total_units >= 0),
    total_amount NUMERIC(14, 2) NOT NULL DEFAULT 0 CHECK (total_amount >= 0),

    tuition_fee NUMERIC(14, 2) NOT NULL DEFAULT 0 CHECK (tuition_fee >= 0),
    registration_fee NUMERIC(14, 2) NOT NULL DEFAULT 0 CHECK (registration_fee >= 0),
    library_fee NUMERIC(14, 2) NOT NULL DEFAULT 0 CHECK (library_fee >= 0),
    lab_fee NUMERIC(14, 2) NOT NULL DEFAULT 0 CHECK (lab_fee >= 0),
    id_fee NUMERIC(14, 2) NOT NULL DEFAULT 0 CHECK (id_fee >= 0),
    other_fees NUMERIC(14, 2) NOT NULL DEFAULT 0 CHECK (other_fees >= 0),

    assessed_by UUID,
    assessed_at TIMESTAMPTZ,
    approved_by UUID,
    approved_at TIMESTAMPTZ,
    remarks TEXT,

    version BIGINT NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_enrollments_student_term UNIQUE (student_id, school_year, semester)
);

CREATE INDEX idx_enrollments_status ON enrollments(status);
CREATE INDEX idx_enrollments_term ON enrollments(school_year, semester);
";

const ENROLLMENT_SUBJECTS_SQL: &str = r"
CREATE TABLE enrollment_subjects (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    enrollment_id UUID NOT NULL REFERENCES enrollments(id) ON DELETE CASCADE,
    subject_id UUID NOT NULL REFERENCES subjects(id) ON DELETE RESTRICT,
    units INTEGER NOT NULL CHECK (units >= 0),
    schedule VARCHAR(100),
    room VARCHAR(50),
    instructor VARCHAR(255),
    grade VARCHAR(10),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_enrollment_subjects UNIQUE (enrollment_id, subject_id)
);
";

const ENROLLMENT_TRANSACTIONS_SQL: &str = r"
CREATE TABLE enrollment_transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    enrollment_id UUID NOT NULL REFERENCES enrollments(id) ON DELETE CASCADE,
    amount NUMERIC(14, 2) NOT NULL CHECK (amount > 0),
    payment_method VARCHAR(50) NOT NULL,
    reference_number VARCHAR(100),
    receipt_ref TEXT,
    status payment_status NOT NULL DEFAULT 'pending',
    processed_by UUID,
    processed_at TIMESTAMPTZ,
    remarks TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_enrollment_transactions_enrollment
    ON enrollment_transactions(enrollment_id, created_at);
";

const ACTIVITY_LOGS_SQL: &str = r"
CREATE TABLE activity_logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    actor_id UUID NOT NULL,
    action VARCHAR(50) NOT NULL,
    entity_type VARCHAR(50) NOT NULL,
    entity_id UUID NOT NULL,
    description TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_activity_logs_entity ON activity_logs(entity_type, entity_id, created_at);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS activity_logs;
DROP TABLE IF EXISTS enrollment_transactions;
DROP TABLE IF EXISTS enrollment_subjects;
DROP TABLE IF EXISTS enrollments;
DROP TABLE IF EXISTS subjects;
DROP TABLE IF EXISTS students;
DROP TYPE IF EXISTS semester;
DROP TYPE IF EXISTS payment_status;
DROP TYPE IF EXISTS enrollment_status;
";
