//! Log entry endpoints.

use axum::{Json, Router, extract::State, routing::post};
use chrono::NaiveDate;
use logbook_common::AppResult;
use logbook_core::{EditLogEntryInput, ReviewDecision, SubmitLogEntryInput};
use logbook_db::entities::log_entry::{
    self, AcademicReview, EntryLocation, IndustrialConfirmation, LogStatus,
};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{self, ApiResponse},
};

/// Log entry response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryResponse {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub activity_date: NaiveDate,
    pub description: String,
    pub location: Option<EntryLocation>,
    pub status: LogStatus,
    pub supervisor_feedback: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub industrial_confirmation: IndustrialConfirmation,
    pub academic_review: AcademicReview,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<log_entry::Model> for LogEntryResponse {
    type Error = logbook_common::AppError;

    fn try_from(entry: log_entry::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            industrial_confirmation: entry.industrial_confirmation()?,
            academic_review: entry.academic_review(),
            location: entry.location(),
            id: entry.id,
            student_id: entry.student_id,
            student_name: entry.student_name,
            activity_date: entry.activity_date,
            description: entry.description,
            status: entry.status,
            supervisor_feedback: entry.supervisor_feedback,
            approved_by: entry.approved_by,
            approved_at: entry.approved_at.map(|t| t.to_rfc3339()),
            created_at: entry.created_at.to_rfc3339(),
            updated_at: entry.updated_at.to_rfc3339(),
        })
    }
}

fn respond(entry: log_entry::Model) -> AppResult<ApiResponse<LogEntryResponse>> {
    Ok(ApiResponse::ok(entry.try_into()?))
}

fn respond_many(entries: Vec<log_entry::Model>) -> AppResult<ApiResponse<Vec<LogEntryResponse>>> {
    let entries = entries
        .into_iter()
        .map(LogEntryResponse::try_from)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(ApiResponse::ok(entries))
}

/// Request naming a single entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryIdRequest {
    pub entry_id: String,
}

/// Write a new entry, as draft or submitted.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubmitLogEntryInput>,
) -> AppResult<ApiResponse<LogEntryResponse>> {
    let entry = state
        .workflow_service
        .submit_log_entry(&user.id, input)
        .await?;
    respond(entry)
}

/// Update entry request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryRequest {
    pub entry_id: String,
    #[serde(flatten)]
    pub changes: EditLogEntryInput,
}

/// Edit a draft or rejected entry, optionally resubmitting it.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateEntryRequest>,
) -> AppResult<ApiResponse<LogEntryResponse>> {
    let entry = state
        .workflow_service
        .edit_log_entry(&user.id, &req.entry_id, req.changes)
        .await?;
    respond(entry)
}

/// Delete a draft or rejected entry.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EntryIdRequest>,
) -> AppResult<impl axum::response::IntoResponse> {
    state
        .workflow_service
        .delete_log_entry(&user.id, &req.entry_id)
        .await?;
    Ok(response::ok())
}

/// The acting student's entries.
async fn mine(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<LogEntryResponse>>> {
    let entries = state
        .workflow_service
        .list_my_log_entries(&user.id)
        .await?;
    respond_many(entries)
}

async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EntryIdRequest>,
) -> AppResult<ApiResponse<LogEntryResponse>> {
    let entry = state
        .workflow_service
        .get_entry(&user.id, &req.entry_id)
        .await?;
    respond(entry)
}

/// Entries waiting on the acting supervisor.
async fn queue(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<LogEntryResponse>>> {
    let entries = state.workflow_service.review_queue(&user.id).await?;
    respond_many(entries)
}

/// Review request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub entry_id: String,
    pub decision: ReviewDecision,
    pub feedback: Option<String>,
}

/// Academic approval or rejection.
async fn review(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ReviewRequest>,
) -> AppResult<ApiResponse<LogEntryResponse>> {
    let entry = state
        .workflow_service
        .review_log_entry(&req.entry_id, &user.id, req.decision, req.feedback)
        .await?;
    respond(entry)
}

/// Industrial confirmation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub entry_id: String,
    pub confirmed: bool,
    pub feedback: Option<String>,
    pub rating: Option<i32>,
}

/// Industrial decision on an approved entry.
async fn confirm(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ConfirmRequest>,
) -> AppResult<ApiResponse<LogEntryResponse>> {
    let entry = state
        .workflow_service
        .confirm_industrial(&req.entry_id, &user.id, req.confirmed, req.feedback, req.rating)
        .await?;
    respond(entry)
}

/// Final academic acknowledgment.
async fn mark_reviewed(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EntryIdRequest>,
) -> AppResult<ApiResponse<LogEntryResponse>> {
    let entry = state
        .workflow_service
        .mark_academic_reviewed(&req.entry_id, &user.id)
        .await?;
    respond(entry)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/update", post(update))
        .route("/delete", post(delete))
        .route("/mine", post(mine))
        .route("/show", post(show))
        .route("/queue", post(queue))
        .route("/review", post(review))
        .route("/confirm", post(confirm))
        .route("/mark-reviewed", post(mark_reviewed))
}
