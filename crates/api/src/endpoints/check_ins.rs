//! Attendance check-in endpoints.
//!
//! Clients report the position sample taken on the device. A sample is either
//! a fix or the reason the device could not produce one.

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};
use logbook_common::{AppError, AppResult, Coordinates};
use logbook_core::{
    AutoCheckInOutcome, GeolocationSampler, LocationError, Position, ReportedLocation,
    StudentLocationStatus,
};
use logbook_db::entities::check_in;
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Position sample reported by a client.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum LocationSample {
    Fix {
        latitude: f64,
        longitude: f64,
        accuracy: Option<f64>,
    },
    Failed {
        error: LocationError,
    },
}

impl LocationSample {
    /// Resolve into a sampling result. `strict` turns out-of-range
    /// coordinates into a validation error instead of a missing position.
    fn into_sample(self, strict: bool) -> AppResult<Result<Position, LocationError>> {
        match self {
            Self::Fix {
                latitude,
                longitude,
                accuracy,
            } => match Coordinates::new(latitude, longitude) {
                Ok(coordinates) => Ok(Ok(Position::now(coordinates, accuracy))),
                Err(e) if strict => Err(e),
                Err(e) => {
                    tracing::debug!(error = %e, "Discarding invalid reported position");
                    Ok(Err(LocationError::PositionUnavailable))
                }
            },
            Self::Failed { error } => Ok(Err(error)),
        }
    }
}

/// Automatic check-in request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCheckInRequest {
    pub sample: LocationSample,
}

/// Login-time automatic check-in.
///
/// Runs on its own task so the check-in completes even if the client goes
/// away. Always answers 200 with the outcome.
async fn auto(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AutoCheckInRequest>,
) -> AppResult<ApiResponse<AutoCheckInOutcome>> {
    let sample = req.sample.into_sample(false)?;
    // A recent fix from an earlier report covers a failed sample.
    let sampler = GeolocationSampler::with_cache(
        Arc::new(ReportedLocation(sample)),
        state.check_in_service.position_cache(&user.id),
    );

    let outcome = state
        .check_in_service
        .spawn_auto_check_in(user.id, sampler)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Automatic check-in task aborted");
            AutoCheckInOutcome::Failed {
                reason: "check-in task aborted".to_string(),
            }
        });

    Ok(ApiResponse::ok(outcome))
}

/// Manual check-in request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualCheckInRequest {
    pub sample: LocationSample,
    /// Human-readable address resolved by the client, if any.
    pub address: Option<String>,
}

/// Manual check-in. A failed sample answers 503 and may be retried.
async fn manual(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ManualCheckInRequest>,
) -> AppResult<ApiResponse<check_in::Model>> {
    let sample = req.sample.into_sample(true)?;
    let stored = state
        .check_in_service
        .check_in_manual(&user.id, sample, req.address)
        .await?;
    Ok(ApiResponse::ok(stored))
}

/// Check-in history request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCheckInsRequest {
    /// Defaults to the acting user.
    pub student_id: Option<String>,
    pub limit: Option<u64>,
}

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListCheckInsRequest>,
) -> AppResult<ApiResponse<Vec<check_in::Model>>> {
    let student_id = req.student_id.unwrap_or_else(|| user.id.clone());

    if !state
        .assignment_service
        .can_view_student(&user, &student_id)
        .await?
    {
        return Err(AppError::Unauthorized(
            "Not allowed to view this student's check-ins".to_string(),
        ));
    }

    let check_ins = state
        .check_in_service
        .list_check_ins(&student_id, req.limit)
        .await?;
    Ok(ApiResponse::ok(check_ins))
}

/// Today's presence of every student supervised by the acting user.
async fn locations(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<StudentLocationStatus>>> {
    if !user.role.is_supervisor() {
        return Err(AppError::Unauthorized(
            "Only supervisors can view student locations".to_string(),
        ));
    }

    let statuses = state
        .check_in_service
        .location_status_for_supervisor(&user.id)
        .await?;
    Ok(ApiResponse::ok(statuses))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auto", post(auto))
        .route("/manual", post(manual))
        .route("/list", post(list))
        .route("/locations", post(locations))
}
