//! Enrollment lifecycle routes.

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};
use enrollo_core::enrollment::{
    AcademicTerm, EnrollmentStatus, FeeBreakdown, PaymentSubmission, ScheduleInfo, Semester,
};
use enrollo_db::EnrollmentFilter;
use enrollo_shared::{
    AppError,
    types::{EnrollmentId, PageRequest, SectionId, StudentId, SubjectId, TransactionId},
};

/// Creates the enrollment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/enrollments", post(create_enrollment).get(list_enrollments))
        .route("/enrollments/{id}", get(get_enrollment))
        .route("/enrollments/{id}/balance", get(outstanding_balance))
        .route("/enrollments/{id}/assess", post(assess))
        .route("/enrollments/{id}/approve-assessment", post(approve_assessment))
        .route("/enrollments/{id}/subjects", post(add_subject))
        .route("/enrollments/{id}/subjects/{subject_id}", delete(remove_subject))
        .route("/enrollments/{id}/submit-subjects", post(submit_subjects))
        .route("/enrollments/{id}/approve-subjects", post(approve_subjects))
        .route("/enrollments/{id}/payments", post(submit_payment))
        .route(
            "/enrollments/{id}/payments/{transaction_id}/verify",
            post(verify_payment),
        )
        .route(
            "/enrollments/{id}/payments/{transaction_id}/reject",
            post(reject_payment),
        )
        .route("/enrollments/{id}/reject", post(reject))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing enrollments.
#[derive(Debug, Deserialize)]
pub struct ListEnrollmentsQuery {
    /// Filter by status (e.g. `for_payment`).
    pub status: Option<String>,
    /// Filter by school year (`YYYY-YYYY`).
    pub school_year: Option<String>,
    /// Filter by semester (`1st`, `2nd`, `summer`).
    pub semester: Option<String>,
    /// Filter by student.
    pub student_id: Option<Uuid>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (default: 20, max: 100).
    pub per_page: Option<u32>,
}

/// Request body for opening an enrollment.
#[derive(Debug, Deserialize)]
pub struct CreateEnrollmentRequest {
    /// Student the enrollment belongs to.
    pub student_id: Uuid,
    /// School year (`YYYY-YYYY`).
    pub school_year: String,
    /// Semester.
    pub semester: String,
    /// Optional class section.
    pub section_id: Option<Uuid>,
}

/// Request body for a fee assessment. Amounts are decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AssessRequest {
    /// Tuition fee.
    pub tuition_fee: Option<String>,
    /// Registration fee.
    pub registration_fee: Option<String>,
    /// Library fee.
    pub library_fee: Option<String>,
    /// Laboratory fee.
    pub lab_fee: Option<String>,
    /// ID fee.
    pub id_fee: Option<String>,
    /// Other fees.
    pub other_fees: Option<String>,
}

/// Request body carrying optional remarks.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemarksRequest {
    /// Free-text remarks.
    pub remarks: Option<String>,
}

/// Request body for adding a subject.
#[derive(Debug, Deserialize)]
pub struct AddSubjectRequest {
    /// Catalog subject to add.
    pub subject_id: Uuid,
    /// Schedule label.
    pub schedule: Option<String>,
    /// Room.
    pub room: Option<String>,
    /// Instructor.
    pub instructor: Option<String>,
}

/// Request body for submitting a payment.
#[derive(Debug, Deserialize)]
pub struct SubmitPaymentRequest {
    /// Payment method (e.g. `gcash`, `cash`).
    pub payment_method: String,
    /// Amount paid, as a decimal string.
    pub amount: String,
    /// External reference number.
    pub reference_number: Option<String>,
    /// Uploaded receipt reference.
    pub receipt_ref: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/enrollments` - Open an enrollment for a term.
async fn create_enrollment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateEnrollmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let semester = parse_semester(&payload.semester)?;
    let term = AcademicTerm::new(&payload.school_year, semester)?;

    let enrollment = state
        .enrollments
        .create_enrollment(
            &auth.actor(),
            StudentId::from_uuid(payload.student_id),
            term,
            payload.section_id.map(SectionId::from_uuid),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// GET `/enrollments` - List enrollments with filters.
async fn list_enrollments(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListEnrollmentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            EnrollmentStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))
        })
        .transpose()?;
    let semester = query.semester.as_deref().map(parse_semester).transpose()?;

    let filter = EnrollmentFilter {
        status,
        school_year: query.school_year,
        semester,
        student_id: query.student_id.map(StudentId::from_uuid),
    };
    let page = PageRequest::new(query.page.unwrap_or(1), query.per_page.unwrap_or(20));

    let enrollments = state.enrollments.list_enrollments(&filter, &page).await?;
    Ok(Json(enrollments))
}

/// GET `/enrollments/{id}` - Enrollment with line items and payments.
async fn get_enrollment(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let details = state
        .enrollments
        .get_enrollment(EnrollmentId::from_uuid(id))
        .await?;
    Ok(Json(details))
}

/// GET `/enrollments/{id}/balance` - Amount due, paid and outstanding.
async fn outstanding_balance(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state
        .enrollments
        .outstanding_balance(EnrollmentId::from_uuid(id))
        .await?;
    Ok(Json(balance))
}

/// POST `/enrollments/{id}/assess` - Record the fee assessment.
async fn assess(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssessRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fees = FeeBreakdown {
        tuition: parse_fee("tuition_fee", payload.tuition_fee.as_deref())?,
        registration: parse_fee("registration_fee", payload.registration_fee.as_deref())?,
        library: parse_fee("library_fee", payload.library_fee.as_deref())?,
        lab: parse_fee("lab_fee", payload.lab_fee.as_deref())?,
        id_fee: parse_fee("id_fee", payload.id_fee.as_deref())?,
        others: parse_fee("other_fees", payload.other_fees.as_deref())?,
    };

    let enrollment = state
        .enrollments
        .assess(EnrollmentId::from_uuid(id), &auth.actor(), fees)
        .await?;
    Ok(Json(enrollment))
}

/// POST `/enrollments/{id}/approve-assessment`
async fn approve_assessment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<RemarksRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let remarks = remarks_of(payload);
    let enrollment = state
        .enrollments
        .approve_assessment(EnrollmentId::from_uuid(id), &auth.actor(), remarks.as_deref())
        .await?;
    Ok(Json(enrollment))
}

/// POST `/enrollments/{id}/subjects` - Add a subject during selection.
async fn add_subject(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddSubjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let schedule = ScheduleInfo {
        schedule: payload.schedule,
        room: payload.room,
        instructor: payload.instructor,
    };
    let enrollment = state
        .enrollments
        .add_subject(
            EnrollmentId::from_uuid(id),
            &auth.actor(),
            SubjectId::from_uuid(payload.subject_id),
            schedule,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// DELETE `/enrollments/{id}/subjects/{subject_id}`
async fn remove_subject(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, subject_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = state
        .enrollments
        .remove_subject(
            EnrollmentId::from_uuid(id),
            &auth.actor(),
            SubjectId::from_uuid(subject_id),
        )
        .await?;
    Ok(Json(enrollment))
}

/// POST `/enrollments/{id}/submit-subjects`
async fn submit_subjects(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = state
        .enrollments
        .submit_subjects(EnrollmentId::from_uuid(id), &auth.actor())
        .await?;
    Ok(Json(enrollment))
}

/// POST `/enrollments/{id}/approve-subjects`
async fn approve_subjects(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<RemarksRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let remarks = remarks_of(payload);
    let enrollment = state
        .enrollments
        .approve_subjects(EnrollmentId::from_uuid(id), &auth.actor(), remarks.as_deref())
        .await?;
    Ok(Json(enrollment))
}

/// POST `/enrollments/{id}/payments` - Submit a payment for verification.
async fn submit_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let submission = PaymentSubmission {
        method: payload.payment_method,
        reference_number: payload.reference_number,
        amount: parse_amount("amount", &payload.amount)?,
        receipt_ref: payload.receipt_ref,
    };
    let payment = state
        .enrollments
        .submit_payment(EnrollmentId::from_uuid(id), &auth.actor(), submission)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// POST `/enrollments/{id}/payments/{transaction_id}/verify`
async fn verify_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, transaction_id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<RemarksRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let remarks = remarks_of(payload);
    let enrollment = state
        .enrollments
        .verify_payment(
            EnrollmentId::from_uuid(id),
            TransactionId::from_uuid(transaction_id),
            &auth.actor(),
            remarks.as_deref(),
        )
        .await?;
    Ok(Json(enrollment))
}

/// POST `/enrollments/{id}/payments/{transaction_id}/reject`
async fn reject_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, transaction_id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<RemarksRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let remarks = remarks_of(payload).unwrap_or_default();
    let enrollment = state
        .enrollments
        .reject_payment(
            EnrollmentId::from_uuid(id),
            TransactionId::from_uuid(transaction_id),
            &auth.actor(),
            &remarks,
        )
        .await?;
    Ok(Json(enrollment))
}

/// POST `/enrollments/{id}/reject` - Reject the enrollment outright.
async fn reject(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<RemarksRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let remarks = remarks_of(payload).unwrap_or_default();
    let enrollment = state
        .enrollments
        .reject(EnrollmentId::from_uuid(id), &auth.actor(), &remarks)
        .await?;
    Ok(Json(enrollment))
}

// ============================================================================
// Helpers
// ============================================================================

fn remarks_of(payload: Option<Json<RemarksRequest>>) -> Option<String> {
    payload.and_then(|Json(body)| body.remarks)
}

fn parse_semester(value: &str) -> Result<Semester, AppError> {
    Semester::parse(value).ok_or_else(|| AppError::Validation(format!("unknown semester: {value}")))
}

fn parse_amount(field: &str, value: &str) -> Result<Decimal, AppError> {
    Decimal::from_str(value.trim())
        .map_err(|_| AppError::Validation(format!("{field} is not a valid amount: {value}")))
}

/// Missing fee components count as zero.
fn parse_fee(field: &str, value: Option<&str>) -> Result<Decimal, AppError> {
    value.map_or(Ok(Decimal::ZERO), |v| parse_amount(field, v))
}
