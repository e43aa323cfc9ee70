//! API endpoints.

mod assignments;
mod check_ins;
mod log_entries;
mod notifications;
mod users;

use axum::{Json, Router};
use serde_json::{Value, json};

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/log-entries", log_entries::router())
        .nest("/check-ins", check_ins::router())
        .nest("/assignments", assignments::router())
        .nest("/notifications", notifications::router())
}

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
