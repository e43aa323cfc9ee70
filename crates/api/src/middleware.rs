//! API middleware and shared state.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    middleware::Next,
    response::Response,
};
use logbook_common::{AppResult, AttendanceConfig};
use logbook_core::{
    AssignmentService, CheckInService, EventPublisherService, LogEntryService,
    NotificationService, UserService, WorkflowService,
};
use logbook_db::repositories::{
    AssignmentRepository, CheckInRepository, LogEntryRepository, NotificationRepository,
    UserRepository,
};
use sea_orm::DatabaseConnection;

/// Header carrying the calling user's ID, set by the upstream session layer.
pub static USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub assignment_service: AssignmentService,
    pub notification_service: NotificationService,
    pub check_in_service: CheckInService,
    pub workflow_service: WorkflowService,
}

impl AppState {
    /// Wire every service onto one database connection.
    pub fn new(
        db: &Arc<DatabaseConnection>,
        attendance: &AttendanceConfig,
        event_publisher: Option<EventPublisherService>,
    ) -> AppResult<Self> {
        let user_repo = UserRepository::new(Arc::clone(db));
        let assignment_repo = AssignmentRepository::new(Arc::clone(db));

        let user_service = UserService::new(user_repo.clone());
        let assignment_service = AssignmentService::new(assignment_repo.clone(), user_repo.clone());

        let mut notification_service =
            NotificationService::new(NotificationRepository::new(Arc::clone(db)));
        if let Some(publisher) = &event_publisher {
            notification_service.set_event_publisher(Arc::clone(publisher));
        }

        let mut check_in_service = CheckInService::new(
            CheckInRepository::new(Arc::clone(db)),
            user_repo.clone(),
            assignment_repo,
            notification_service.clone(),
            attendance,
        )?;

        let log_entry_service = LogEntryService::new(
            LogEntryRepository::new(Arc::clone(db)),
            user_repo,
            attendance.timezone()?,
        );
        let mut workflow_service = WorkflowService::new(
            log_entry_service,
            assignment_service.clone(),
            user_service.clone(),
            notification_service.clone(),
        );

        if let Some(publisher) = event_publisher {
            check_in_service.set_event_publisher(Arc::clone(&publisher));
            workflow_service.set_event_publisher(publisher);
        }

        Ok(Self {
            user_service,
            assignment_service,
            notification_service,
            check_in_service,
            workflow_service,
        })
    }
}

/// Resolves the `X-User-Id` header to an active user.
///
/// Requests without a known user pass through unauthenticated; handlers that
/// need an actor reject them through [`crate::extractors::AuthUser`].
pub async fn actor_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(user_id) = req
        .headers()
        .get(&USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    {
        match state.user_service.get_active(&user_id).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => {
                tracing::debug!(user_id = %user_id, error = %e, "Ignoring unknown actor");
            }
        }
    }

    next.run(req).await
}
