//! Enrollment repository.
//!
//! Every mutating call runs in one database transaction: the enrollment
//! row is loaded with `SELECT ... FOR UPDATE`, the core state machine
//! computes the transition, and the enrollment update, line item or
//! payment change, and activity log row are written before commit. The
//! enrollment update is additionally guarded by its `version` column.

use std::time::Duration;

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use enrollo_core::enrollment::{
    AcademicTerm, Actor, AuditEntry, BalanceSummary, Enrollment, EnrollmentAction,
    EnrollmentError, EnrollmentStateMachine, EnrollmentStatus, EnrollmentSubject, FeeBreakdown,
    FeeLedger, FieldUpdate, LineItemChange, PaymentChange, PaymentStatus, PaymentSubmission,
    PaymentTransaction, ScheduleInfo, Semester, Stamp, Subject, Transition,
};
use enrollo_shared::EnrollmentConfig;
use enrollo_shared::types::{
    EnrollmentId, EnrollmentSubjectId, PageRequest, PageResponse, SectionId, StudentId,
    SubjectId, TransactionId, UserId,
};

use crate::entities::{
    activity_logs, enrollment_subjects, enrollment_transactions, enrollments,
    sea_orm_active_enums as db_enums, students, subjects,
};

/// An enrollment with its line items and payments.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentDetails {
    /// The enrollment.
    pub enrollment: Enrollment,
    /// Line items in the order they were added.
    pub subjects: Vec<EnrollmentSubject>,
    /// Payments in the order they were submitted.
    pub payments: Vec<PaymentTransaction>,
}

impl EnrollmentDetails {
    fn payment(&self, id: TransactionId) -> Result<&PaymentTransaction, EnrollmentError> {
        self.payments
            .iter()
            .find(|p| p.id == id)
            .ok_or(EnrollmentError::PaymentNotFound(id))
    }
}

/// Filter for listing enrollments.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentFilter {
    /// Only enrollments in this status.
    pub status: Option<EnrollmentStatus>,
    /// Only enrollments for this school year.
    pub school_year: Option<String>,
    /// Only enrollments for this semester.
    pub semester: Option<Semester>,
    /// Only enrollments of this student.
    pub student_id: Option<StudentId>,
}

/// Result of a committed transition.
#[derive(Debug, Clone)]
pub struct Applied {
    /// Enrollment as stored after the transition.
    pub enrollment: Enrollment,
    /// What was written.
    pub transition: Transition,
}

/// Enrollment repository.
#[derive(Debug, Clone)]
pub struct EnrollmentRepository {
    db: DatabaseConnection,
    machine: EnrollmentStateMachine,
    conflict_retries: u32,
    retry_backoff: Duration,
}

impl EnrollmentRepository {
    /// Creates a new enrollment repository.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &EnrollmentConfig) -> Self {
        Self {
            db,
            machine: EnrollmentStateMachine::new(FeeLedger::new(config.per_unit_rate)),
            conflict_retries: config.conflict_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Creates an enrollment in `PendingAssessment`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The actor is not a student
    /// - The student does not exist
    /// - The student already has an enrollment for the term
    /// - Database operation fails
    pub async fn create_enrollment(
        &self,
        actor: &Actor,
        student_id: StudentId,
        term: AcademicTerm,
        section_id: Option<SectionId>,
    ) -> Result<Enrollment, EnrollmentError> {
        let (enrollment, audit) = self.machine.create(actor, student_id, term, section_id)?;

        let txn = self.db.begin().await.map_err(db_err)?;

        students::Entity::find_by_id(student_id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(EnrollmentError::StudentNotFound(student_id))?;

        let already_exists = || EnrollmentError::AlreadyExists {
            school_year: enrollment.term.school_year.clone(),
            semester: enrollment.term.semester.to_string(),
        };

        let existing = enrollments::Entity::find()
            .filter(enrollments::Column::StudentId.eq(student_id.into_inner()))
            .filter(enrollments::Column::SchoolYear.eq(enrollment.term.school_year.as_str()))
            .filter(enrollments::Column::Semester.eq(semester_to_db(enrollment.term.semester)))
            .one(&txn)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Err(already_exists());
        }

        new_enrollment_model(&enrollment)?
            .insert(&txn)
            .await
            .map_err(|e| unique_violation_or(e, already_exists))?;
        insert_audit(&txn, &audit).await?;

        txn.commit().await.map_err(db_err)?;

        tracing::info!(
            enrollment_id = %enrollment.id,
            student_id = %student_id,
            term = %enrollment.term,
            actor_id = %actor.user_id,
            "Enrollment created"
        );

        Ok(enrollment)
    }

    /// Assesses fees for a pending enrollment.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Enrollment is not found
    /// - Enrollment is not in `PendingAssessment`
    /// - The actor is not a registrar
    /// - A fee component is negative
    /// - Database operation fails
    pub async fn assess(
        &self,
        id: EnrollmentId,
        actor: &Actor,
        fees: FeeBreakdown,
    ) -> Result<Enrollment, EnrollmentError> {
        let applied = self
            .transition(id, |machine, locked| {
                machine.assess(&locked.enrollment, actor, fees)
            })
            .await?;
        Ok(applied.enrollment)
    }

    /// Approves the assessment and opens subject selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the enrollment is not found, is not in
    /// `ForAdminApproval`, the actor is not an admin, or the database fails.
    pub async fn approve_assessment(
        &self,
        id: EnrollmentId,
        actor: &Actor,
        remarks: Option<&str>,
    ) -> Result<Enrollment, EnrollmentError> {
        let applied = self
            .transition(id, |machine, locked| {
                machine.approve_assessment(&locked.enrollment, actor, remarks)
            })
            .await?;
        Ok(applied.enrollment)
    }

    /// Adds a catalog subject to the enrollment.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Enrollment or subject is not found
    /// - Enrollment is not in `ForSubjectSelection`
    /// - The actor is not a student
    /// - The subject is already on the enrollment
    /// - Database operation fails
    pub async fn add_subject(
        &self,
        id: EnrollmentId,
        actor: &Actor,
        subject_id: SubjectId,
        schedule: ScheduleInfo,
    ) -> Result<Enrollment, EnrollmentError> {
        let subject = self.find_subject(subject_id).await?;

        let applied = self
            .transition(id, |machine, locked| {
                EnrollmentStateMachine::check(
                    EnrollmentAction::AddSubject,
                    locked.enrollment.status,
                    actor,
                )?;
                let subject = subject
                    .as_ref()
                    .ok_or(EnrollmentError::SubjectNotFound(subject_id))?;
                machine.add_subject(
                    &locked.enrollment,
                    &locked.subjects,
                    actor,
                    subject,
                    schedule.clone(),
                )
            })
            .await?;
        Ok(applied.enrollment)
    }

    /// Removes a subject from the enrollment.
    ///
    /// # Errors
    ///
    /// Returns an error if the enrollment is not found, is not in
    /// `ForSubjectSelection`, the actor is not a student, the subject is
    /// not on the enrollment, or the database fails.
    pub async fn remove_subject(
        &self,
        id: EnrollmentId,
        actor: &Actor,
        subject_id: SubjectId,
    ) -> Result<Enrollment, EnrollmentError> {
        let applied = self
            .transition(id, |machine, locked| {
                machine.remove_subject(&locked.enrollment, &locked.subjects, actor, subject_id)
            })
            .await?;
        Ok(applied.enrollment)
    }

    /// Submits the subject load for dean approval.
    ///
    /// # Errors
    ///
    /// Returns an error if the enrollment is not found, is not in
    /// `ForSubjectSelection`, the actor is not a student, no subject is
    /// selected, or the database fails.
    pub async fn submit_subjects(
        &self,
        id: EnrollmentId,
        actor: &Actor,
    ) -> Result<Enrollment, EnrollmentError> {
        let applied = self
            .transition(id, |machine, locked| {
                machine.submit_subjects(&locked.enrollment, &locked.subjects, actor)
            })
            .await?;
        Ok(applied.enrollment)
    }

    /// Approves the subject load.
    ///
    /// # Errors
    ///
    /// Returns an error if the enrollment is not found, is not in
    /// `ForDeanApproval`, the actor is not a dean, or the database fails.
    pub async fn approve_subjects(
        &self,
        id: EnrollmentId,
        actor: &Actor,
        remarks: Option<&str>,
    ) -> Result<Enrollment, EnrollmentError> {
        let applied = self
            .transition(id, |machine, locked| {
                machine.approve_subjects(&locked.enrollment, actor, remarks)
            })
            .await?;
        Ok(applied.enrollment)
    }

    /// Records a payment and moves the enrollment to `PaymentVerification`.
    ///
    /// # Errors
    ///
    /// Returns an error if the enrollment is not found, is not in
    /// `ForPayment`, the actor is not a student, the amount is not
    /// positive, the method is blank, or the database fails.
    pub async fn submit_payment(
        &self,
        id: EnrollmentId,
        actor: &Actor,
        submission: PaymentSubmission,
    ) -> Result<PaymentTransaction, EnrollmentError> {
        let applied = self
            .transition(id, |machine, locked| {
                machine.submit_payment(&locked.enrollment, actor, submission.clone())
            })
            .await?;

        match applied.transition.payment {
            Some(PaymentChange::Created(payment)) => Ok(payment),
            _ => Err(EnrollmentError::Database(
                "payment submission produced no payment".to_string(),
            )),
        }
    }

    /// Verifies a pending payment and completes the enrollment.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Enrollment is not found, or the payment is not one of its payments
    /// - Enrollment is not in `PaymentVerification`
    /// - The actor is not a registrar or cashier
    /// - The payment was already processed
    /// - Database operation fails
    pub async fn verify_payment(
        &self,
        id: EnrollmentId,
        transaction_id: TransactionId,
        actor: &Actor,
        remarks: Option<&str>,
    ) -> Result<Enrollment, EnrollmentError> {
        let applied = self
            .transition(id, |machine, locked| {
                EnrollmentStateMachine::check(
                    EnrollmentAction::VerifyPayment,
                    locked.enrollment.status,
                    actor,
                )?;
                let payment = locked.payment(transaction_id)?;
                machine.verify_payment(&locked.enrollment, payment, actor, remarks)
            })
            .await?;
        Ok(applied.enrollment)
    }

    /// Rejects a pending payment and returns the enrollment to `ForPayment`.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::verify_payment`], plus
    /// `RemarksRequired` when `remarks` is blank.
    pub async fn reject_payment(
        &self,
        id: EnrollmentId,
        transaction_id: TransactionId,
        actor: &Actor,
        remarks: &str,
    ) -> Result<Enrollment, EnrollmentError> {
        let applied = self
            .transition(id, |machine, locked| {
                EnrollmentStateMachine::check(
                    EnrollmentAction::RejectPayment,
                    locked.enrollment.status,
                    actor,
                )?;
                let payment = locked.payment(transaction_id)?;
                machine.reject_payment(&locked.enrollment, payment, actor, remarks)
            })
            .await?;
        Ok(applied.enrollment)
    }

    /// Rejects the enrollment.
    ///
    /// # Errors
    ///
    /// Returns an error if the enrollment is not found or already terminal,
    /// the actor is not an admin or registrar, `remarks` is blank, or the
    /// database fails.
    pub async fn reject(
        &self,
        id: EnrollmentId,
        actor: &Actor,
        remarks: &str,
    ) -> Result<Enrollment, EnrollmentError> {
        let applied = self
            .transition(id, |machine, locked| {
                machine.reject(&locked.enrollment, actor, remarks)
            })
            .await?;
        Ok(applied.enrollment)
    }

    /// Gets an enrollment with its line items and payments.
    ///
    /// # Errors
    ///
    /// Returns an error if the enrollment is not found or the database fails.
    pub async fn get_enrollment(
        &self,
        id: EnrollmentId,
    ) -> Result<EnrollmentDetails, EnrollmentError> {
        let (_, details) = load(&self.db, id, false).await?;
        Ok(details)
    }

    /// Lists enrollments matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database fails.
    pub async fn list_enrollments(
        &self,
        filter: &EnrollmentFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<Enrollment>, EnrollmentError> {
        let mut query = enrollments::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(enrollments::Column::Status.eq(status_to_db(status)));
        }
        if let Some(school_year) = &filter.school_year {
            query = query.filter(enrollments::Column::SchoolYear.eq(school_year.as_str()));
        }
        if let Some(semester) = filter.semester {
            query = query.filter(enrollments::Column::Semester.eq(semester_to_db(semester)));
        }
        if let Some(student_id) = filter.student_id {
            query = query.filter(enrollments::Column::StudentId.eq(student_id.into_inner()));
        }

        let paginator = query
            .order_by_desc(enrollments::Column::CreatedAt)
            .order_by_desc(enrollments::Column::Id)
            .paginate(&self.db, page.limit());
        let total = paginator.num_items().await.map_err(db_err)?;
        let models = paginator
            .fetch_page(page.page_index())
            .await
            .map_err(db_err)?;

        let data = models
            .iter()
            .map(enrollment_from_db)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Outstanding balance of an enrollment.
    ///
    /// # Errors
    ///
    /// Returns an error if the enrollment is not found or the database fails.
    pub async fn outstanding_balance(
        &self,
        id: EnrollmentId,
    ) -> Result<BalanceSummary, EnrollmentError> {
        let (_, details) = load(&self.db, id, false).await?;
        Ok(FeeLedger::balance(
            details.enrollment.total_amount,
            &details.payments,
        ))
    }

    async fn find_subject(&self, id: SubjectId) -> Result<Option<Subject>, EnrollmentError> {
        subjects::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(|model| {
                Ok(Subject {
                    id,
                    code: model.code,
                    name: model.name,
                    units: units_from_db(model.units)?,
                })
            })
            .transpose()
    }

    /// Runs `op` against the locked enrollment, retrying on version conflicts.
    async fn transition<F>(&self, id: EnrollmentId, op: F) -> Result<Applied, EnrollmentError>
    where
        F: Fn(&EnrollmentStateMachine, &EnrollmentDetails) -> Result<Transition, EnrollmentError>
            + Sync,
    {
        let mut attempt = 0u32;
        loop {
            match self.try_transition(id, &op).await {
                Err(err) if err.is_retryable() && attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::warn!(
                        enrollment_id = %id,
                        attempt,
                        "Concurrent modification, retrying"
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                result => return result,
            }
        }
    }

    async fn try_transition<F>(&self, id: EnrollmentId, op: &F) -> Result<Applied, EnrollmentError>
    where
        F: Fn(&EnrollmentStateMachine, &EnrollmentDetails) -> Result<Transition, EnrollmentError>
            + Sync,
    {
        let txn = self.db.begin().await.map_err(db_err)?;
        let (row, locked) = load(&txn, id, true).await?;

        // Dropping `txn` on error rolls back.
        let transition = op(&self.machine, &locked)?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        write_enrollment(&txn, &row, &transition, now).await?;
        write_line_item(&txn, &transition, now).await?;
        write_payment(&txn, id, &transition, now).await?;
        insert_audit(&txn, &transition.audit).await?;

        txn.commit().await.map_err(db_err)?;

        tracing::info!(
            enrollment_id = %id,
            action = %transition.action,
            from = %transition.from,
            to = %transition.to,
            actor_id = %transition.audit.actor_id,
            "Enrollment transition applied"
        );

        let mut enrollment = transition.applied_to(&locked.enrollment);
        enrollment.version = row.version + 1;
        enrollment.updated_at = now.with_timezone(&Utc);

        Ok(Applied {
            enrollment,
            transition,
        })
    }
}

async fn load<C: ConnectionTrait>(
    conn: &C,
    id: EnrollmentId,
    lock: bool,
) -> Result<(enrollments::Model, EnrollmentDetails), EnrollmentError> {
    let mut select = enrollments::Entity::find_by_id(id.into_inner());
    if lock {
        select = select.lock_exclusive();
    }
    let row = select
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(EnrollmentError::NotFound(id))?;

    let subjects = enrollment_subjects::Entity::find()
        .filter(enrollment_subjects::Column::EnrollmentId.eq(row.id))
        .order_by_asc(enrollment_subjects::Column::CreatedAt)
        .all(conn)
        .await
        .map_err(db_err)?
        .iter()
        .map(line_item_from_db)
        .collect::<Result<Vec<_>, _>>()?;

    let payments = enrollment_transactions::Entity::find()
        .filter(enrollment_transactions::Column::EnrollmentId.eq(row.id))
        .order_by_asc(enrollment_transactions::Column::CreatedAt)
        .all(conn)
        .await
        .map_err(db_err)?
        .iter()
        .map(payment_from_db)
        .collect();

    let details = EnrollmentDetails {
        enrollment: enrollment_from_db(&row)?,
        subjects,
        payments,
    };
    Ok((row, details))
}

async fn write_enrollment(
    txn: &DatabaseTransaction,
    current: &enrollments::Model,
    transition: &Transition,
    now: DateTimeWithTimeZone,
) -> Result<(), EnrollmentError> {
    let update = &transition.update;
    let mut active = enrollments::ActiveModel {
        version: Set(current.version + 1),
        updated_at: Set(now),
        ..Default::default()
    };

    if let Some(status) = update.status {
        active.status = Set(status_to_db(status));
    }
    if let Some(totals) = update.totals {
        active.total_units = Set(units_to_db(totals.total_units)?);
        active.total_amount = Set(totals.total_amount);
    }
    if let Some(fees) = update.fees {
        active.tuition_fee = Set(fees.tuition);
        active.registration_fee = Set(fees.registration);
        active.library_fee = Set(fees.library);
        active.lab_fee = Set(fees.lab);
        active.id_fee = Set(fees.id_fee);
        active.other_fees = Set(fees.others);
    }
    if let Some(stamp) = update.assessed {
        active.assessed_by = Set(Some(stamp.by.into_inner()));
        active.assessed_at = Set(Some(stamp.at.into()));
    }
    if let Some(stamp) = update.approved {
        active.approved_by = Set(Some(stamp.by.into_inner()));
        active.approved_at = Set(Some(stamp.at.into()));
    }
    match &update.remarks {
        FieldUpdate::Keep => {}
        FieldUpdate::Set(text) => active.remarks = Set(Some(text.clone())),
        FieldUpdate::Clear => active.remarks = Set(None),
    }

    let result = enrollments::Entity::update_many()
        .set(active)
        .filter(enrollments::Column::Id.eq(current.id))
        .filter(enrollments::Column::Version.eq(current.version))
        .exec(txn)
        .await
        .map_err(db_err)?;

    if result.rows_affected == 0 {
        return Err(EnrollmentError::ConcurrencyConflict(EnrollmentId::from_uuid(
            current.id,
        )));
    }
    Ok(())
}

async fn write_line_item(
    txn: &DatabaseTransaction,
    transition: &Transition,
    now: DateTimeWithTimeZone,
) -> Result<(), EnrollmentError> {
    match &transition.line_item {
        Some(LineItemChange::Added(item)) => {
            let active = enrollment_subjects::ActiveModel {
                id: Set(item.id.into_inner()),
                enrollment_id: Set(item.enrollment_id.into_inner()),
                subject_id: Set(item.subject_id.into_inner()),
                units: Set(units_to_db(item.units)?),
                schedule: Set(item.schedule.schedule.clone()),
                room: Set(item.schedule.room.clone()),
                instructor: Set(item.schedule.instructor.clone()),
                grade: Set(item.grade.clone()),
                created_at: Set(now),
            };
            enrollment_subjects::Entity::insert(active)
                .exec(txn)
                .await
                .map_err(|e| {
                    unique_violation_or(e, || EnrollmentError::DuplicateSubject(item.subject_id))
                })?;
        }
        Some(LineItemChange::Removed {
            line_item_id,
            subject_id,
        }) => {
            let result = enrollment_subjects::Entity::delete_by_id(line_item_id.into_inner())
                .exec(txn)
                .await
                .map_err(db_err)?;
            if result.rows_affected == 0 {
                return Err(EnrollmentError::SubjectNotFound(*subject_id));
            }
        }
        None => {}
    }
    Ok(())
}

async fn write_payment(
    txn: &DatabaseTransaction,
    enrollment_id: EnrollmentId,
    transition: &Transition,
    now: DateTimeWithTimeZone,
) -> Result<(), EnrollmentError> {
    match &transition.payment {
        Some(PaymentChange::Created(payment)) => {
            let active = enrollment_transactions::ActiveModel {
                id: Set(payment.id.into_inner()),
                enrollment_id: Set(payment.enrollment_id.into_inner()),
                amount: Set(payment.amount),
                payment_method: Set(payment.method.clone()),
                reference_number: Set(payment.reference_number.clone()),
                receipt_ref: Set(payment.receipt_ref.clone()),
                status: Set(payment_status_to_db(payment.status)),
                processed_by: Set(None),
                processed_at: Set(None),
                remarks: Set(payment.remarks.clone()),
                created_at: Set(payment.created_at.into()),
                updated_at: Set(now),
            };
            enrollment_transactions::Entity::insert(active)
                .exec(txn)
                .await
                .map_err(db_err)?;
        }
        Some(PaymentChange::Finalized {
            id,
            status,
            processed,
            remarks,
        }) => {
            let active = enrollment_transactions::ActiveModel {
                status: Set(payment_status_to_db(*status)),
                processed_by: Set(Some(processed.by.into_inner())),
                processed_at: Set(Some(processed.at.into())),
                remarks: Set(remarks.clone()),
                updated_at: Set(now),
                ..Default::default()
            };
            let result = enrollment_transactions::Entity::update_many()
                .set(active)
                .filter(enrollment_transactions::Column::Id.eq(id.into_inner()))
                .filter(enrollment_transactions::Column::EnrollmentId.eq(enrollment_id.into_inner()))
                .filter(enrollment_transactions::Column::Status.eq(db_enums::PaymentStatus::Pending))
                .exec(txn)
                .await
                .map_err(db_err)?;
            if result.rows_affected == 0 {
                return Err(EnrollmentError::PaymentAlreadyProcessed(*id));
            }
        }
        None => {}
    }
    Ok(())
}

async fn insert_audit<C: ConnectionTrait>(
    conn: &C,
    audit: &AuditEntry,
) -> Result<(), EnrollmentError> {
    let active = activity_logs::ActiveModel {
        id: Set(Uuid::now_v7()),
        actor_id: Set(audit.actor_id.into_inner()),
        action: Set(audit.action.as_str().to_string()),
        entity_type: Set(audit.entity_type.to_string()),
        entity_id: Set(audit.entity_id.into_inner()),
        description: Set(audit.description.clone()),
        created_at: Set(audit.occurred_at.into()),
    };
    activity_logs::Entity::insert(active)
        .exec(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

fn new_enrollment_model(
    enrollment: &Enrollment,
) -> Result<enrollments::ActiveModel, EnrollmentError> {
    Ok(enrollments::ActiveModel {
        id: Set(enrollment.id.into_inner()),
        student_id: Set(enrollment.student_id.into_inner()),
        school_year: Set(enrollment.term.school_year.clone()),
        semester: Set(semester_to_db(enrollment.term.semester)),
        section_id: Set(enrollment.section_id.map(SectionId::into_inner)),
        status: Set(status_to_db(enrollment.status)),
        total_units: Set(units_to_db(enrollment.total_units)?),
        total_amount: Set(enrollment.total_amount),
        tuition_fee: Set(enrollment.fees.tuition),
        registration_fee: Set(enrollment.fees.registration),
        library_fee: Set(enrollment.fees.library),
        lab_fee: Set(enrollment.fees.lab),
        id_fee: Set(enrollment.fees.id_fee),
        other_fees: Set(enrollment.fees.others),
        assessed_by: Set(None),
        assessed_at: Set(None),
        approved_by: Set(None),
        approved_at: Set(None),
        remarks: Set(enrollment.remarks.clone()),
        version: Set(enrollment.version),
        created_at: Set(enrollment.created_at.into()),
        updated_at: Set(enrollment.updated_at.into()),
    })
}

fn db_err(err: DbErr) -> EnrollmentError {
    tracing::error!(error = %err, "Database error");
    EnrollmentError::Database(err.to_string())
}

fn unique_violation_or(err: DbErr, on_unique: impl FnOnce() -> EnrollmentError) -> EnrollmentError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => on_unique(),
        _ => db_err(err),
    }
}

fn units_to_db(units: u32) -> Result<i32, EnrollmentError> {
    i32::try_from(units).map_err(|_| EnrollmentError::Database(format!("units out of range: {units}")))
}

fn units_from_db(units: i32) -> Result<u32, EnrollmentError> {
    u32::try_from(units).map_err(|_| EnrollmentError::Database(format!("negative units: {units}")))
}

fn stamp_from_db(by: Option<Uuid>, at: Option<DateTimeWithTimeZone>) -> Option<Stamp> {
    Some(Stamp {
        by: UserId::from_uuid(by?),
        at: at?.with_timezone(&Utc),
    })
}

fn enrollment_from_db(model: &enrollments::Model) -> Result<Enrollment, EnrollmentError> {
    Ok(Enrollment {
        id: EnrollmentId::from_uuid(model.id),
        student_id: StudentId::from_uuid(model.student_id),
        term: AcademicTerm {
            school_year: model.school_year.clone(),
            semester: semester_from_db(model.semester),
        },
        section_id: model.section_id.map(SectionId::from_uuid),
        status: status_from_db(model.status),
        total_units: units_from_db(model.total_units)?,
        total_amount: model.total_amount,
        fees: FeeBreakdown {
            tuition: model.tuition_fee,
            registration: model.registration_fee,
            library: model.library_fee,
            lab: model.lab_fee,
            id_fee: model.id_fee,
            others: model.other_fees,
        },
        assessed: stamp_from_db(model.assessed_by, model.assessed_at),
        approved: stamp_from_db(model.approved_by, model.approved_at),
        remarks: model.remarks.clone(),
        version: model.version,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn line_item_from_db(
    model: &enrollment_subjects::Model,
) -> Result<EnrollmentSubject, EnrollmentError> {
    Ok(EnrollmentSubject {
        id: EnrollmentSubjectId::from_uuid(model.id),
        enrollment_id: EnrollmentId::from_uuid(model.enrollment_id),
        subject_id: SubjectId::from_uuid(model.subject_id),
        units: units_from_db(model.units)?,
        schedule: ScheduleInfo {
            schedule: model.schedule.clone(),
            room: model.room.clone(),
            instructor: model.instructor.clone(),
        },
        grade: model.grade.clone(),
    })
}

fn payment_from_db(model: &enrollment_transactions::Model) -> PaymentTransaction {
    PaymentTransaction {
        id: TransactionId::from_uuid(model.id),
        enrollment_id: EnrollmentId::from_uuid(model.enrollment_id),
        amount: model.amount,
        method: model.payment_method.clone(),
        reference_number: model.reference_number.clone(),
        receipt_ref: model.receipt_ref.clone(),
        status: payment_status_from_db(model.status),
        processed: stamp_from_db(model.processed_by, model.processed_at),
        remarks: model.remarks.clone(),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

/// Converts core EnrollmentStatus to database EnrollmentStatus.
pub(crate) fn status_to_db(status: EnrollmentStatus) -> db_enums::EnrollmentStatus {
    match status {
        EnrollmentStatus::PendingAssessment => db_enums::EnrollmentStatus::PendingAssessment,
        EnrollmentStatus::ForAdminApproval => db_enums::EnrollmentStatus::ForAdminApproval,
        EnrollmentStatus::ForSubjectSelection => db_enums::EnrollmentStatus::ForSubjectSelection,
        EnrollmentStatus::ForDeanApproval => db_enums::EnrollmentStatus::ForDeanApproval,
        EnrollmentStatus::ForPayment => db_enums::EnrollmentStatus::ForPayment,
        EnrollmentStatus::PaymentVerification => db_enums::EnrollmentStatus::PaymentVerification,
        EnrollmentStatus::Enrolled => db_enums::EnrollmentStatus::Enrolled,
        EnrollmentStatus::Rejected => db_enums::EnrollmentStatus::Rejected,
    }
}

/// Converts database EnrollmentStatus to core EnrollmentStatus.
pub(crate) fn status_from_db(status: db_enums::EnrollmentStatus) -> EnrollmentStatus {
    match status {
        db_enums::EnrollmentStatus::PendingAssessment => EnrollmentStatus::PendingAssessment,
        db_enums::EnrollmentStatus::ForAdminApproval => EnrollmentStatus::ForAdminApproval,
        db_enums::EnrollmentStatus::ForSubjectSelection => EnrollmentStatus::ForSubjectSelection,
        db_enums::EnrollmentStatus::ForDeanApproval => EnrollmentStatus::ForDeanApproval,
        db_enums::EnrollmentStatus::ForPayment => EnrollmentStatus::ForPayment,
        db_enums::EnrollmentStatus::PaymentVerification => EnrollmentStatus::PaymentVerification,
        db_enums::EnrollmentStatus::Enrolled => EnrollmentStatus::Enrolled,
        db_enums::EnrollmentStatus::Rejected => EnrollmentStatus::Rejected,
    }
}

fn payment_status_to_db(status: PaymentStatus) -> db_enums::PaymentStatus {
    match status {
        PaymentStatus::Pending => db_enums::PaymentStatus::Pending,
        PaymentStatus::Completed => db_enums::PaymentStatus::Completed,
        PaymentStatus::Rejected => db_enums::PaymentStatus::Rejected,
    }
}

fn payment_status_from_db(status: db_enums::PaymentStatus) -> PaymentStatus {
    match status {
        db_enums::PaymentStatus::Pending => PaymentStatus::Pending,
        db_enums::PaymentStatus::Completed => PaymentStatus::Completed,
        db_enums::PaymentStatus::Rejected => PaymentStatus::Rejected,
    }
}

fn semester_to_db(semester: Semester) -> db_enums::Semester {
    match semester {
        Semester::First => db_enums::Semester::First,
        Semester::Second => db_enums::Semester::Second,
        Semester::Summer => db_enums::Semester::Summer,
    }
}

fn semester_from_db(semester: db_enums::Semester) -> Semester {
    match semester {
        db_enums::Semester::First => Semester::First,
        db_enums::Semester::Second => Semester::Second,
        db_enums::Semester::Summer => Semester::Summer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use sea_orm::Iterable;

    #[test]
    fn test_status_conversion_round_trip() {
        for status in EnrollmentStatus::ALL {
            assert_eq!(status_from_db(status_to_db(status)), status);
        }
        for status in db_enums::EnrollmentStatus::iter() {
            assert_eq!(status_to_db(status_from_db(status)), status);
        }
    }

    #[test]
    fn test_db_enum_values_match_core_names() {
        use sea_orm::ActiveEnum;
        for status in EnrollmentStatus::ALL {
            assert_eq!(status_to_db(status).to_value(), status.as_str());
        }
        for status in [PaymentStatus::Pending, PaymentStatus::Completed, PaymentStatus::Rejected] {
            assert_eq!(payment_status_to_db(status).to_value(), status.as_str());
        }
    }

    #[test]
    fn test_units_conversion() {
        assert_eq!(units_to_db(3).unwrap(), 3);
        assert!(units_to_db(u32::MAX).is_err());
        assert!(units_from_db(-1).is_err());
    }

    #[test]
    fn test_stamp_requires_both_columns() {
        let now: DateTimeWithTimeZone = Utc::now().into();
        assert!(stamp_from_db(Some(Uuid::now_v7()), Some(now)).is_some());
        assert!(stamp_from_db(None, Some(now)).is_none());
        assert!(stamp_from_db(Some(Uuid::now_v7()), None).is_none());
    }

    #[test]
    fn test_enrollment_model_round_trip() {
        let now = Utc::now();
        let enrollment = Enrollment {
            id: EnrollmentId::new(),
            student_id: StudentId::new(),
            term: AcademicTerm::new("2025-2026", Semester::Second).unwrap(),
            section_id: None,
            status: EnrollmentStatus::ForPayment,
            total_units: 6,
            total_amount: dec!(9200.00),
            fees: FeeBreakdown {
                tuition: dec!(5000),
                ..FeeBreakdown::default()
            },
            assessed: None,
            approved: None,
            remarks: Some("note".to_string()),
            version: 4,
            created_at: now,
            updated_at: now,
        };
        let model = enrollments::Model {
            id: enrollment.id.into_inner(),
            student_id: enrollment.student_id.into_inner(),
            school_year: "2025-2026".to_string(),
            semester: db_enums::Semester::Second,
            section_id: None,
            status: db_enums::EnrollmentStatus::ForPayment,
            total_units: 6,
            total_amount: dec!(9200.00),
            tuition_fee: dec!(5000),
            registration_fee: Decimal::ZERO,
            library_fee: Decimal::ZERO,
            lab_fee: Decimal::ZERO,
            id_fee: Decimal::ZERO,
            other_fees: Decimal::ZERO,
            assessed_by: None,
            assessed_at: None,
            approved_by: None,
            approved_at: None,
            remarks: Some("note".to_string()),
            version: 4,
            created_at: now.into(),
            updated_at: now.into(),
        };
        assert_eq!(enrollment_from_db(&model).unwrap(), enrollment);
    }
}
