//! Users endpoints.

use axum::{Json, Router, extract::State, routing::post};
use logbook_common::{AppError, AppResult};
use logbook_core::{CreateUserInput, UpdatePlacementInput};
use logbook_db::entities::user::{self, UserRole};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// User response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub created_at: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub matric_number: Option<String>,
    pub placement_address: Option<String>,
    pub placement_latitude: Option<f64>,
    pub placement_longitude: Option<f64>,
    pub timezone: Option<String>,
    pub assigned_supervisor_id: Option<String>,
    pub assigned_industrial_supervisor_id: Option<String>,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at.to_rfc3339(),
            email: user.email,
            name: user.name,
            role: user.role,
            institution: user.institution,
            department: user.department,
            matric_number: user.matric_number,
            placement_address: user.placement_address,
            placement_latitude: user.placement_latitude,
            placement_longitude: user.placement_longitude,
            timezone: user.timezone,
            assigned_supervisor_id: user.assigned_supervisor_id,
            assigned_industrial_supervisor_id: user.assigned_industrial_supervisor_id,
        }
    }
}

fn require_admin(user: &user::Model) -> AppResult<()> {
    if user.role != UserRole::Admin {
        return Err(AppError::Unauthorized("Admin only".to_string()));
    }
    Ok(())
}

/// Get the acting user.
async fn me(AuthUser(user): AuthUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(user.into())
}

/// Create a user. Admin only.
async fn create(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    require_admin(&actor)?;
    let user = state.user_service.create(input).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Show user request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowUserRequest {
    pub user_id: String,
}

/// Get a user by ID.
///
/// Student profiles are visible to the student, their supervisors and
/// admins. Staff profiles are visible to everyone signed in.
async fn show(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ShowUserRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.user_service.get(&req.user_id).await?;

    if user.role == UserRole::Student
        && !state
            .assignment_service
            .can_view_student(&actor, &user.id)
            .await?
    {
        return Err(AppError::Unauthorized(
            "Not allowed to view this student".to_string(),
        ));
    }

    Ok(ApiResponse::ok(user.into()))
}

/// Update placement request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlacementRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub placement: UpdatePlacementInput,
}

/// Change a student's registered placement. Admins or the student.
async fn update_placement(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdatePlacementRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    if actor.role != UserRole::Admin && actor.id != req.user_id {
        return Err(AppError::Unauthorized(
            "Only the student or an admin can change the placement".to_string(),
        ));
    }

    let user = state
        .user_service
        .update_placement(&req.user_id, req.placement)
        .await?;
    Ok(ApiResponse::ok(user.into()))
}

/// List users request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersRequest {
    pub role: UserRole,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    50
}

/// List users by role. Admin only.
async fn list(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListUsersRequest>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    require_admin(&actor)?;
    let users = state
        .user_service
        .list_by_role(req.role, req.limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(users.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", post(me))
        .route("/create", post(create))
        .route("/show", post(show))
        .route("/update-placement", post(update_placement))
        .route("/list", post(list))
}
