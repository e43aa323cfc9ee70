//! Notifications endpoints.

use axum::{Json, Router, extract::State, routing::post};
use logbook_common::{AppError, AppResult};
use logbook_db::entities::notification::{Model as NotificationModel, NotificationKind};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// List notifications request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsRequest {
    /// Maximum results (default: 50, max: 100)
    pub limit: Option<u64>,
    /// Cursor for pagination (before this ID)
    pub until_id: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
    /// Include unread count in response metadata
    #[serde(default)]
    pub with_unread_count: bool,
}

/// Notifications response with optional metadata.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsListResponse {
    pub notifications: Vec<NotificationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u64>,
}

/// Notification response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub created_at: String,
    pub is_read: bool,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl From<NotificationModel> for NotificationResponse {
    fn from(n: NotificationModel) -> Self {
        Self {
            id: n.id,
            created_at: n.created_at.to_rfc3339(),
            is_read: n.is_read,
            kind: n.kind,
            title: n.title,
            message: n.message,
        }
    }
}

/// Get notifications for the authenticated user.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListNotificationsRequest>,
) -> AppResult<ApiResponse<NotificationsListResponse>> {
    let notifications = state
        .notification_service
        .get_notifications(&user.id, req.limit, req.until_id.as_deref(), req.unread_only)
        .await?;

    let unread_count = if req.with_unread_count {
        Some(state.notification_service.count_unread(&user.id).await?)
    } else {
        None
    };

    Ok(ApiResponse::ok(NotificationsListResponse {
        notifications: notifications.into_iter().map(Into::into).collect(),
        unread_count,
    }))
}

/// Mark notification as read request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadRequest {
    pub notification_id: String,
}

/// Mark a notification as read.
async fn mark_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<MarkAsReadRequest>,
) -> AppResult<ApiResponse<()>> {
    let found = state
        .notification_service
        .mark_as_read(&req.notification_id, &user.id)
        .await?;
    if !found {
        return Err(AppError::NotFound(format!(
            "Notification {}",
            req.notification_id
        )));
    }
    Ok(ApiResponse::ok(()))
}

/// Mark all as read response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllAsReadResponse {
    pub count: u64,
}

/// Mark all notifications as read.
async fn mark_all_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MarkAllAsReadResponse>> {
    let count = state
        .notification_service
        .mark_all_as_read(&user.id)
        .await?;
    Ok(ApiResponse::ok(MarkAllAsReadResponse { count }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list))
        .route("/mark-read", post(mark_as_read))
        .route("/mark-all-read", post(mark_all_as_read))
}
