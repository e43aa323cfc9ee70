//! Supervisor assignment endpoints.

use axum::{Json, Router, extract::State, routing::post};
use logbook_common::{AppError, AppResult};
use logbook_db::entities::{
    assignment::{self, SupervisorType},
    user::UserRole,
};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Assignment response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub id: String,
    pub student_id: String,
    pub supervisor_id: String,
    pub supervisor_type: SupervisorType,
    pub assigned_by: String,
    pub assigned_at: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated_at: Option<String>,
}

impl From<assignment::Model> for AssignmentResponse {
    fn from(a: assignment::Model) -> Self {
        Self {
            id: a.id,
            student_id: a.student_id,
            supervisor_id: a.supervisor_id,
            supervisor_type: a.supervisor_type,
            assigned_by: a.assigned_by,
            assigned_at: a.assigned_at.to_rfc3339(),
            is_active: a.is_active,
            deactivated_at: a.deactivated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Create assignment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    pub student_id: String,
    pub supervisor_id: String,
    pub supervisor_type: SupervisorType,
}

/// Assign a supervisor to a student, replacing any active one of that type.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateAssignmentRequest>,
) -> AppResult<ApiResponse<AssignmentResponse>> {
    let assignment = state
        .assignment_service
        .assign(&req.student_id, &req.supervisor_id, &user.id, req.supervisor_type)
        .await?;
    Ok(ApiResponse::ok(assignment.into()))
}

/// Delete assignment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAssignmentRequest {
    pub assignment_id: String,
}

/// Deactivate an assignment. The row stays as history.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<DeleteAssignmentRequest>,
) -> AppResult<ApiResponse<AssignmentResponse>> {
    let assignment = state
        .assignment_service
        .unassign_as(&user.id, &req.assignment_id)
        .await?;
    Ok(ApiResponse::ok(assignment.into()))
}

/// Assignment history request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    pub student_id: String,
}

async fn history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<HistoryRequest>,
) -> AppResult<ApiResponse<Vec<AssignmentResponse>>> {
    if !state
        .assignment_service
        .can_view_student(&user, &req.student_id)
        .await?
    {
        return Err(AppError::Unauthorized(
            "Not allowed to view this student".to_string(),
        ));
    }

    let assignments = state
        .assignment_service
        .history_for_student(&req.student_id)
        .await?;
    Ok(ApiResponse::ok(
        assignments.into_iter().map(Into::into).collect(),
    ))
}

/// List active assignments request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAssignmentsRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    50
}

/// All active assignments. Admin only.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListAssignmentsRequest>,
) -> AppResult<ApiResponse<Vec<AssignmentResponse>>> {
    if user.role != UserRole::Admin {
        return Err(AppError::Unauthorized("Admin only".to_string()));
    }

    let assignments = state
        .assignment_service
        .list_active(req.limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(
        assignments.into_iter().map(Into::into).collect(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/delete", post(delete))
        .route("/history", post(history))
        .route("/list", post(list))
}
