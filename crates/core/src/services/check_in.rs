//! Attendance check-in service.
//!
//! Records presence events, deduplicates automatic check-ins to one per
//! student per local calendar day, and classifies every position against the
//! student's registered placement location.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use futures::future::try_join_all;
use logbook_common::{
    AppError, AppResult, AttendanceConfig, IdGenerator,
    geo::{self, SiteClassification},
};
use logbook_db::{
    entities::{
        check_in::{self, CheckInStatus, SiteStatus},
        notification::NotificationKind,
        user::{self, UserRole},
    },
    repositories::{AssignmentRepository, CheckInRepository, UserRepository},
};
use sea_orm::Set;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::services::event_publisher::{DomainEvent, EventPublisherService, publish_quietly};
use crate::services::geolocation::{
    GeolocationSampler, LocationError, Position, PositionCache, SampleOptions,
};
use crate::services::notification::NotificationService;
use crate::services::user::timezone_of;

/// Default page size for check-in history.
const DEFAULT_HISTORY_LIMIT: u64 = 100;

/// Why no automatic check-in row was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyCheckedInToday,
    NotAStudent,
}

/// Result of asking the ledger for an automatic check-in.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Recorded(check_in::Model),
    Skipped(SkipReason),
}

/// Result of the login-time automatic check-in. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AutoCheckInOutcome {
    Recorded { check_in: check_in::Model },
    Skipped { reason: SkipReason },
    Failed { reason: String },
}

/// Presence of a student relative to the registered placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    OnSite,
    OffSite,
    /// No check-in today, or no registered coordinates to compare with.
    Unknown,
}

/// One row of a supervisor's location overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentLocationStatus {
    pub student_id: String,
    pub student_name: String,
    pub placement_address: Option<String>,
    pub last_check_in: Option<check_in::Model>,
    pub distance_meters: Option<f64>,
    /// `distance_meters` for display, e.g. `"120m"` or `"1.3km"`.
    pub distance_label: Option<String>,
    pub status: PresenceStatus,
}

/// Check-in service for business logic.
#[derive(Clone)]
pub struct CheckInService {
    check_in_repo: CheckInRepository,
    user_repo: UserRepository,
    assignment_repo: AssignmentRepository,
    notification_service: NotificationService,
    event_publisher: Option<EventPublisherService>,
    attendance: AttendanceConfig,
    default_tz: Tz,
    id_gen: IdGenerator,
    position_caches: Arc<Mutex<HashMap<String, PositionCache>>>,
}

impl CheckInService {
    /// Create a new check-in service.
    pub fn new(
        check_in_repo: CheckInRepository,
        user_repo: UserRepository,
        assignment_repo: AssignmentRepository,
        notification_service: NotificationService,
        attendance: &AttendanceConfig,
    ) -> AppResult<Self> {
        Ok(Self {
            check_in_repo,
            user_repo,
            assignment_repo,
            notification_service,
            event_publisher: None,
            default_tz: attendance.timezone()?,
            attendance: attendance.clone(),
            id_gen: IdGenerator::new(),
            position_caches: Arc::default(),
        })
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Sampling options derived from configuration.
    #[must_use]
    pub fn sample_options(&self) -> SampleOptions {
        SampleOptions::from(&self.attendance)
    }

    /// The student's last fix, shared by every sampler built for them.
    #[must_use]
    pub fn position_cache(&self, student_id: &str) -> PositionCache {
        self.position_caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(student_id.to_string())
            .or_default()
            .clone()
    }

    /// The student's current calendar day.
    #[must_use]
    pub fn today_for(&self, student: &user::Model) -> NaiveDate {
        self.local_date(student, Utc::now())
    }

    fn local_date(&self, student: &user::Model, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&timezone_of(student, self.default_tz))
            .date_naive()
    }

    fn geofence(
        &self,
        student: &user::Model,
        position: &Position,
    ) -> (Option<f64>, Option<SiteClassification>) {
        match student.placement_coordinates() {
            Some(placement) => {
                let distance = geo::distance_meters(placement, position.coordinates);
                (
                    Some(distance),
                    Some(geo::classify(distance, self.attendance.geofence_radius_meters)),
                )
            }
            None => (None, None),
        }
    }

    async fn insert(
        &self,
        student: &user::Model,
        position: &Position,
        address: String,
        is_automatic: bool,
        now: DateTime<Utc>,
    ) -> AppResult<check_in::Model> {
        let local_date = self.local_date(student, now);
        let (distance, site) = self.geofence(student, position);
        let status = if self.attendance.enforce_geofence && site == Some(SiteClassification::OffSite)
        {
            CheckInStatus::Failed
        } else {
            CheckInStatus::Success
        };

        let model = check_in::ActiveModel {
            id: Set(self.id_gen.generate()),
            student_id: Set(student.id.clone()),
            student_name: Set(student.name.clone()),
            checked_in_at: Set(now.fixed_offset()),
            local_date: Set(local_date),
            latitude: Set(position.coordinates.latitude),
            longitude: Set(position.coordinates.longitude),
            address: Set(address),
            status: Set(status),
            is_automatic: Set(is_automatic),
            distance_meters: Set(distance),
            site_status: Set(site.map(SiteStatus::from)),
            auto_day: Set(is_automatic.then_some(local_date)),
        };

        let stored = self.check_in_repo.create(model).await?;

        publish_quietly(
            self.event_publisher.as_ref(),
            DomainEvent::CheckInRecorded {
                check_in_id: stored.id.clone(),
                student_id: stored.student_id.clone(),
                is_automatic,
            },
        )
        .await;

        Ok(stored)
    }

    /// Record an automatic check-in unless the student already has one for
    /// today.
    pub async fn record_automatic(
        &self,
        student: &user::Model,
        position: &Position,
    ) -> AppResult<RecordOutcome> {
        self.record_automatic_at(student, position, Utc::now()).await
    }

    /// [`Self::record_automatic`] with an explicit clock reading.
    pub async fn record_automatic_at(
        &self,
        student: &user::Model,
        position: &Position,
        now: DateTime<Utc>,
    ) -> AppResult<RecordOutcome> {
        if student.role != UserRole::Student {
            return Ok(RecordOutcome::Skipped(SkipReason::NotAStudent));
        }

        let today = self.local_date(student, now);
        if self
            .check_in_repo
            .find_automatic_on(&student.id, today)
            .await?
            .is_some()
        {
            tracing::debug!(student_id = %student.id, day = %today, "Automatic check-in already recorded");
            return Ok(RecordOutcome::Skipped(SkipReason::AlreadyCheckedInToday));
        }

        let address = student
            .placement_address
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| geo::format_coordinates(position.coordinates));

        match self.insert(student, position, address, true, now).await {
            Ok(stored) => Ok(RecordOutcome::Recorded(stored)),
            // The unique (student_id, auto_day) index caught a concurrent insert.
            Err(AppError::Conflict(_)) => {
                Ok(RecordOutcome::Skipped(SkipReason::AlreadyCheckedInToday))
            }
            Err(e) => Err(e),
        }
    }

    /// Record a manual check-in. No deduplication happens at this level.
    pub async fn record_manual(
        &self,
        student: &user::Model,
        position: &Position,
        resolved_address: Option<String>,
    ) -> AppResult<check_in::Model> {
        let address = resolved_address
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| geo::format_coordinates(position.coordinates));
        self.insert(student, position, address, false, Utc::now())
            .await
    }

    async fn try_check_in_auto(
        &self,
        student_id: &str,
        sample: Result<Position, LocationError>,
    ) -> AppResult<RecordOutcome> {
        let student = self.user_repo.get_by_id(student_id).await?;
        if student.role != UserRole::Student || !student.is_active {
            return Ok(RecordOutcome::Skipped(SkipReason::NotAStudent));
        }
        let position = sample?;
        self.record_automatic(&student, &position).await
    }

    /// Login-time automatic check-in.
    ///
    /// Never fails: sampling and storage errors are logged and reported as
    /// [`AutoCheckInOutcome::Failed`].
    pub async fn check_in_auto(
        &self,
        student_id: &str,
        sample: Result<Position, LocationError>,
    ) -> AutoCheckInOutcome {
        match self.try_check_in_auto(student_id, sample).await {
            Ok(RecordOutcome::Recorded(stored)) => {
                tracing::info!(student_id = %student_id, check_in_id = %stored.id, "Automatic check-in recorded");
                self.notification_service
                    .notify_quietly(
                        student_id,
                        NotificationKind::Success,
                        "Auto Check-in Successful",
                        &format!("You have been automatically checked in at {}", stored.address),
                    )
                    .await;
                AutoCheckInOutcome::Recorded { check_in: stored }
            }
            Ok(RecordOutcome::Skipped(reason)) => AutoCheckInOutcome::Skipped { reason },
            Err(e) => {
                tracing::warn!(student_id = %student_id, error = %e, "Automatic check-in failed");
                AutoCheckInOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Sample a position and run [`Self::check_in_auto`] on a detached task.
    pub fn spawn_auto_check_in(
        &self,
        student_id: String,
        sampler: GeolocationSampler,
    ) -> JoinHandle<AutoCheckInOutcome> {
        let service = self.clone();
        let options = self.sample_options();
        tokio::spawn(async move {
            let sample = sampler.sample(options).await;
            service.check_in_auto(&student_id, sample).await
        })
    }

    /// Manual check-in requested by the student.
    ///
    /// A failed sample surfaces as [`AppError::LocationUnavailable`], which
    /// the caller may retry.
    pub async fn check_in_manual(
        &self,
        student_id: &str,
        sample: Result<Position, LocationError>,
        resolved_address: Option<String>,
    ) -> AppResult<check_in::Model> {
        let student = self.user_repo.get_by_id(student_id).await?;
        if student.role != UserRole::Student || !student.is_active {
            return Err(AppError::Unauthorized(
                "Only students can check in".to_string(),
            ));
        }

        let position = sample.inspect_err(|e| {
            tracing::info!(student_id = %student_id, error = %e, "Manual check-in without a position");
        })?;

        if self.attendance.manual_daily_limit {
            let today = self.today_for(&student);
            if self.check_in_repo.count_manual_on(&student.id, today).await? > 0 {
                return Err(AppError::Conflict(
                    "Already checked in manually today".to_string(),
                ));
            }
        }

        let stored = self
            .record_manual(&student, &position, resolved_address)
            .await?;
        tracing::info!(student_id = %student_id, check_in_id = %stored.id, site = ?stored.site_status, "Manual check-in recorded");
        Ok(stored)
    }

    /// A student's check-ins, newest first.
    pub async fn list_check_ins(
        &self,
        student_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<check_in::Model>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(500);
        self.check_in_repo.find_by_student(student_id, limit).await
    }

    /// Whether the student already has an automatic check-in today.
    pub async fn has_automatic_today(&self, student: &user::Model) -> AppResult<bool> {
        Ok(self
            .check_in_repo
            .find_automatic_on(&student.id, self.today_for(student))
            .await?
            .is_some())
    }

    /// Where each student assigned to `supervisor_id` was seen today.
    pub async fn location_status_for_supervisor(
        &self,
        supervisor_id: &str,
    ) -> AppResult<Vec<StudentLocationStatus>> {
        let student_ids: Vec<String> = self
            .assignment_repo
            .find_active_for_supervisor(supervisor_id, None)
            .await?
            .into_iter()
            .map(|a| a.student_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let students = self.user_repo.find_by_ids(&student_ids).await?;
        let latest = try_join_all(
            students
                .iter()
                .map(|s| self.check_in_repo.find_latest(&s.id)),
        )
        .await?;

        let mut statuses = Vec::with_capacity(students.len());
        for (student, latest) in students.into_iter().zip(latest) {
            let today = self.today_for(&student);

            let (distance_meters, status) = match (&latest, student.placement_coordinates()) {
                (Some(last), Some(placement)) if last.local_date == today => {
                    let distance = geo::distance_meters(placement, last.coordinates());
                    let status =
                        match geo::classify(distance, self.attendance.geofence_radius_meters) {
                            SiteClassification::OnSite => PresenceStatus::OnSite,
                            SiteClassification::OffSite => PresenceStatus::OffSite,
                        };
                    (Some(distance), status)
                }
                _ => (None, PresenceStatus::Unknown),
            };

            statuses.push(StudentLocationStatus {
                student_id: student.id,
                student_name: student.name,
                placement_address: student.placement_address,
                last_check_in: latest,
                distance_meters,
                distance_label: distance_meters.map(geo::format_distance),
                status,
            });
        }

        Ok(statuses)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::geolocation::{FixedLocation, ReportedLocation};
    use chrono::TimeZone;
    use logbook_common::Coordinates;
    use logbook_db::entities::assignment::{self, SupervisorType};
    use logbook_db::repositories::NotificationRepository;
    use logbook_db::test_utils::TestDatabase;
    use std::sync::Arc;

    const PLACEMENT: (f64, f64) = (6.5095, 3.3711);

    struct Fixture {
        db: TestDatabase,
        service: CheckInService,
        notifications: NotificationService,
    }

    async fn fixture(attendance: AttendanceConfig) -> Fixture {
        let db = TestDatabase::new().await.unwrap();
        let notifications =
            NotificationService::new(NotificationRepository::new(db.connection()));
        let service = CheckInService::new(
            CheckInRepository::new(db.connection()),
            UserRepository::new(db.connection()),
            AssignmentRepository::new(db.connection()),
            notifications.clone(),
            &attendance,
        )
        .unwrap();
        Fixture {
            db,
            service,
            notifications,
        }
    }

    async fn seed_user(
        db: &TestDatabase,
        id: &str,
        role: UserRole,
        placement: Option<(&str, f64, f64)>,
        timezone: Option<&str>,
    ) -> user::Model {
        UserRepository::new(db.connection())
            .create(user::ActiveModel {
                id: Set(id.to_string()),
                email: Set(format!("{id}@example.edu")),
                name: Set(format!("Name {id}")),
                role: Set(role),
                placement_address: Set(placement.map(|p| p.0.to_string())),
                placement_latitude: Set(placement.map(|p| p.1)),
                placement_longitude: Set(placement.map(|p| p.2)),
                timezone: Set(timezone.map(str::to_string)),
                is_active: Set(true),
                created_at: Set(Utc::now().fixed_offset()),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    fn at(lat: f64, lon: f64) -> Position {
        Position::now(Coordinates::new(lat, lon).unwrap(), Some(10.0))
    }

    fn on_site() -> Position {
        at(PLACEMENT.0, PLACEMENT.1)
    }

    /// ~150 m north of the placement.
    fn off_site() -> Position {
        at(PLACEMENT.0 + 150.0 / 111_195.0, PLACEMENT.1)
    }

    #[tokio::test]
    async fn test_repeated_auto_check_in_same_day_stores_one_row() {
        let f = fixture(AttendanceConfig::default()).await;
        seed_user(&f.db, "s1", UserRole::Student, Some(("Tech Hub, Yaba", PLACEMENT.0, PLACEMENT.1)), None).await;

        let first = f.service.check_in_auto("s1", Ok(on_site())).await;
        let second = f.service.check_in_auto("s1", Ok(on_site())).await;
        let third = f.service.check_in_auto("s1", Ok(off_site())).await;

        match first {
            AutoCheckInOutcome::Recorded { check_in } => {
                assert!(check_in.is_automatic);
                assert_eq!(check_in.status, CheckInStatus::Success);
                assert_eq!(check_in.address, "Tech Hub, Yaba");
                assert_eq!(check_in.site_status, Some(SiteStatus::OnSite));
            }
            other => panic!("unexpected {other:?}"),
        }
        let skipped = AutoCheckInOutcome::Skipped {
            reason: SkipReason::AlreadyCheckedInToday,
        };
        assert_eq!(second, skipped);
        assert_eq!(third, skipped);

        let rows = f.service.list_check_ins("s1", None).await.unwrap();
        assert_eq!(rows.len(), 1);

        let notes = f
            .notifications
            .get_notifications("s1", None, None, false)
            .await
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Auto Check-in Successful");
    }

    #[tokio::test]
    async fn test_auto_check_in_without_placement_uses_coordinates_as_address() {
        let f = fixture(AttendanceConfig::default()).await;
        seed_user(&f.db, "s1", UserRole::Student, None, None).await;

        let outcome = f.service.check_in_auto("s1", Ok(at(40.7128, -74.006))).await;
        match outcome {
            AutoCheckInOutcome::Recorded { check_in } => {
                assert_eq!(check_in.address, "40.712800, -74.006000");
                assert!(check_in.distance_meters.is_none());
                assert!(check_in.site_status.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_auto_check_in_swallows_location_failure() {
        let f = fixture(AttendanceConfig::default()).await;
        let student = seed_user(&f.db, "s1", UserRole::Student, None, None).await;

        let outcome = f
            .service
            .check_in_auto("s1", Err(LocationError::PermissionDenied))
            .await;
        assert!(matches!(outcome, AutoCheckInOutcome::Failed { .. }));
        assert!(f.service.list_check_ins("s1", None).await.unwrap().is_empty());
        assert!(!f.service.has_automatic_today(&student).await.unwrap());

        // Unknown users fail quietly too.
        let unknown = f.service.check_in_auto("ghost", Ok(on_site())).await;
        assert!(matches!(unknown, AutoCheckInOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_auto_check_in_skips_non_students() {
        let f = fixture(AttendanceConfig::default()).await;
        seed_user(&f.db, "sup", UserRole::AcademicSupervisor, None, None).await;

        let outcome = f.service.check_in_auto("sup", Ok(on_site())).await;
        assert_eq!(
            outcome,
            AutoCheckInOutcome::Skipped {
                reason: SkipReason::NotAStudent
            }
        );
    }

    #[tokio::test]
    async fn test_local_calendar_day_follows_student_timezone() {
        let f = fixture(AttendanceConfig::default()).await;
        // Lagos is UTC+1 all year.
        let student = seed_user(&f.db, "s1", UserRole::Student, None, Some("Africa/Lagos")).await;

        let late_utc = Utc.with_ymd_and_hms(2025, 3, 1, 23, 30, 0).unwrap();
        let after_utc_midnight = Utc.with_ymd_and_hms(2025, 3, 2, 0, 10, 0).unwrap();
        let next_lagos_day = Utc.with_ymd_and_hms(2025, 3, 2, 23, 30, 0).unwrap();

        let first = f
            .service
            .record_automatic_at(&student, &on_site(), late_utc)
            .await
            .unwrap();
        match first {
            RecordOutcome::Recorded(row) => {
                assert_eq!(row.local_date, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
            }
            RecordOutcome::Skipped(reason) => panic!("skipped: {reason:?}"),
        }

        // Same Lagos day even though the UTC date changed.
        let second = f
            .service
            .record_automatic_at(&student, &on_site(), after_utc_midnight)
            .await
            .unwrap();
        assert_eq!(
            second,
            RecordOutcome::Skipped(SkipReason::AlreadyCheckedInToday)
        );

        let third = f
            .service
            .record_automatic_at(&student, &on_site(), next_lagos_day)
            .await
            .unwrap();
        assert!(matches!(third, RecordOutcome::Recorded(_)));
    }

    #[tokio::test]
    async fn test_manual_check_in_surfaces_location_error_as_retryable() {
        let f = fixture(AttendanceConfig::default()).await;
        seed_user(&f.db, "s1", UserRole::Student, None, None).await;

        let err = f
            .service
            .check_in_manual("s1", Err(LocationError::Timeout), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LocationUnavailable(_)));
        assert!(err.is_retryable());

        // Retry with a position works.
        let stored = f
            .service
            .check_in_manual("s1", Ok(on_site()), Some("Reception".to_string()))
            .await
            .unwrap();
        assert!(!stored.is_automatic);
        assert!(stored.auto_day.is_none());
        assert_eq!(stored.address, "Reception");
    }

    #[tokio::test]
    async fn test_manual_daily_limit() {
        let f = fixture(AttendanceConfig::default()).await;
        seed_user(&f.db, "s1", UserRole::Student, None, None).await;

        // An automatic check-in does not use up the manual slot.
        f.service.check_in_auto("s1", Ok(on_site())).await;
        f.service
            .check_in_manual("s1", Ok(on_site()), None)
            .await
            .unwrap();
        let second = f.service.check_in_manual("s1", Ok(on_site()), None).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));

        let unlimited = fixture(AttendanceConfig {
            manual_daily_limit: false,
            ..AttendanceConfig::default()
        })
        .await;
        let student = seed_user(&unlimited.db, "s2", UserRole::Student, None, None).await;
        for _ in 0..3 {
            unlimited
                .service
                .record_manual(&student, &on_site(), None)
                .await
                .unwrap();
        }
        assert_eq!(
            unlimited.service.list_check_ins("s2", None).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_manual_check_in_rejects_supervisors() {
        let f = fixture(AttendanceConfig::default()).await;
        seed_user(&f.db, "sup", UserRole::IndustrialSupervisor, None, None).await;

        let result = f.service.check_in_manual("sup", Ok(on_site()), None).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_enforced_geofence_marks_off_site_as_failed() {
        let f = fixture(AttendanceConfig {
            enforce_geofence: true,
            manual_daily_limit: false,
            ..AttendanceConfig::default()
        })
        .await;
        let student = seed_user(&f.db, "s1", UserRole::Student, Some(("Tech Hub", PLACEMENT.0, PLACEMENT.1)), None).await;

        let far = f
            .service
            .record_manual(&student, &off_site(), None)
            .await
            .unwrap();
        assert_eq!(far.status, CheckInStatus::Failed);
        assert_eq!(far.site_status, Some(SiteStatus::OffSite));
        assert!(far.distance_meters.unwrap() > 100.0);

        let near = f
            .service
            .record_manual(&student, &on_site(), None)
            .await
            .unwrap();
        assert_eq!(near.status, CheckInStatus::Success);
    }

    #[tokio::test]
    async fn test_spawned_auto_check_in_runs_detached() {
        let f = fixture(AttendanceConfig::default()).await;
        seed_user(&f.db, "s1", UserRole::Student, None, None).await;

        let sampler = GeolocationSampler::new(Arc::new(FixedLocation::new(
            Coordinates::new(PLACEMENT.0, PLACEMENT.1).unwrap(),
            Some(5.0),
        )));
        let outcome = f
            .service
            .spawn_auto_check_in("s1".to_string(), sampler)
            .await
            .unwrap();
        assert!(matches!(outcome, AutoCheckInOutcome::Recorded { .. }));

        let failing = GeolocationSampler::new(Arc::new(ReportedLocation(Err(
            LocationError::PositionUnavailable,
        ))));
        let outcome = f
            .service
            .spawn_auto_check_in("s1".to_string(), failing)
            .await
            .unwrap();
        assert!(matches!(outcome, AutoCheckInOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_location_status_for_supervisor() {
        let f = fixture(AttendanceConfig {
            manual_daily_limit: false,
            ..AttendanceConfig::default()
        })
        .await;
        let placement = Some(("Tech Hub", PLACEMENT.0, PLACEMENT.1));
        seed_user(&f.db, "sup", UserRole::IndustrialSupervisor, None, None).await;
        let near = seed_user(&f.db, "s-near", UserRole::Student, placement, None).await;
        let far = seed_user(&f.db, "s-far", UserRole::Student, placement, None).await;
        seed_user(&f.db, "s-none", UserRole::Student, placement, None).await;

        let assignments = AssignmentRepository::new(f.db.connection());
        for (i, student) in ["s-near", "s-far", "s-none"].iter().enumerate() {
            assignments
                .replace_active(assignment::ActiveModel {
                    id: Set(format!("a{i}")),
                    student_id: Set((*student).to_string()),
                    supervisor_id: Set("sup".to_string()),
                    supervisor_type: Set(SupervisorType::Industrial),
                    assigned_by: Set("admin".to_string()),
                    assigned_at: Set(Utc::now().fixed_offset()),
                    is_active: Set(true),
                    deactivated_at: Set(None),
                })
                .await
                .unwrap();
        }

        f.service.record_manual(&near, &on_site(), None).await.unwrap();
        f.service.record_manual(&far, &off_site(), None).await.unwrap();

        let statuses = f.service.location_status_for_supervisor("sup").await.unwrap();
        assert_eq!(statuses.len(), 3);
        let by_id = |id: &str| statuses.iter().find(|s| s.student_id == id).unwrap();

        assert_eq!(by_id("s-near").status, PresenceStatus::OnSite);
        assert_eq!(by_id("s-far").status, PresenceStatus::OffSite);
        assert_eq!(by_id("s-none").status, PresenceStatus::Unknown);
        assert!(by_id("s-none").last_check_in.is_none());

        assert_eq!(by_id("s-near").distance_label.as_deref(), Some("0m"));
        assert_eq!(by_id("s-far").distance_label.as_deref(), Some("150m"));
        assert_eq!(by_id("s-none").distance_label, None);
    }

    #[tokio::test]
    async fn test_auto_check_in_falls_back_to_students_recent_fix() {
        let f = fixture(AttendanceConfig::default()).await;
        seed_user(&f.db, "s1", UserRole::Student, Some(("Tech Hub", PLACEMENT.0, PLACEMENT.1)), None).await;
        seed_user(&f.db, "s2", UserRole::Student, None, None).await;

        f.service.position_cache("s1").store(on_site());
        let denied = || Arc::new(ReportedLocation(Err(LocationError::PermissionDenied)));

        let outcome = f
            .service
            .spawn_auto_check_in(
                "s1".to_string(),
                GeolocationSampler::with_cache(denied(), f.service.position_cache("s1")),
            )
            .await
            .unwrap();
        match outcome {
            AutoCheckInOutcome::Recorded { check_in } => {
                assert_eq!(check_in.site_status, Some(SiteStatus::OnSite));
            }
            other => panic!("expected a recorded check-in, got {other:?}"),
        }

        let outcome = f
            .service
            .spawn_auto_check_in(
                "s2".to_string(),
                GeolocationSampler::with_cache(denied(), f.service.position_cache("s2")),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, AutoCheckInOutcome::Failed { .. }));
    }
}
