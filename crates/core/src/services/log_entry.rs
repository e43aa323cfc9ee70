//! Log entry store.
//!
//! Owns the lifecycle of daily log entries: creation, patching, status
//! transitions and deletion. It does not know who is calling; ownership and
//! supervisor checks belong to the workflow service.
//!
//! Every write is a compare-and-swap on the entry's `version` column. A lost
//! race reloads the row, re-runs the caller's precondition against it and
//! tries again.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use logbook_common::{AppError, AppResult, IdGenerator};
use logbook_db::{
    entities::log_entry::{self, EntryLocation, LogStatus},
    repositories::{LogEntryRepository, UserRepository},
};
use sea_orm::Set;

use crate::services::user::timezone_of;

/// Attempts made by a compare-and-swap write before giving up.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Data for a new entry.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub student_id: String,
    pub student_name: String,
    pub activity_date: NaiveDate,
    pub description: String,
    pub location: Option<EntryLocation>,
    pub status: LogStatus,
}

/// A partial update. `None` leaves the field alone.
#[derive(Debug, Clone, Default)]
pub struct LogEntryPatch {
    pub activity_date: Option<NaiveDate>,
    pub description: Option<String>,
    /// `Some(None)` clears the location.
    pub location: Option<Option<EntryLocation>>,
    pub status: Option<LogStatus>,
    pub student_name: Option<String>,
}

fn require_description(description: &str) -> AppResult<()> {
    if description.trim().is_empty() {
        return Err(AppError::Validation(
            "description is required to submit an entry".to_string(),
        ));
    }
    Ok(())
}

fn require_not_future(date: NaiveDate, today: NaiveDate) -> AppResult<()> {
    if date > today {
        return Err(AppError::Validation(format!(
            "activity date {date} is in the future"
        )));
    }
    Ok(())
}

fn set_location(entry: &mut log_entry::ActiveModel, location: Option<EntryLocation>) {
    match location {
        Some(loc) => {
            entry.latitude = Set(Some(loc.latitude));
            entry.longitude = Set(Some(loc.longitude));
            entry.address = Set(loc.address);
        }
        None => {
            entry.latitude = Set(None);
            entry.longitude = Set(None);
            entry.address = Set(None);
        }
    }
}

/// Log entry store.
#[derive(Clone)]
pub struct LogEntryService {
    log_entry_repo: LogEntryRepository,
    user_repo: UserRepository,
    default_tz: Tz,
    id_gen: IdGenerator,
}

impl LogEntryService {
    /// Create a new log entry store. `default_tz` is used for students
    /// without a timezone of their own.
    #[must_use]
    pub const fn new(
        log_entry_repo: LogEntryRepository,
        user_repo: UserRepository,
        default_tz: Tz,
    ) -> Self {
        Self {
            log_entry_repo,
            user_repo,
            default_tz,
            id_gen: IdGenerator::new(),
        }
    }

    /// The current calendar day of a student.
    pub async fn today_for(&self, student_id: &str) -> AppResult<NaiveDate> {
        let tz = match self.user_repo.find_by_id(student_id).await? {
            Some(student) => timezone_of(&student, self.default_tz),
            None => self.default_tz,
        };
        Ok(Utc::now().with_timezone(&tz).date_naive())
    }

    /// Create an entry as draft or pending.
    pub async fn create(&self, input: NewLogEntry) -> AppResult<log_entry::Model> {
        match input.status {
            LogStatus::Draft => {}
            LogStatus::Pending => require_description(&input.description)?,
            other => {
                return Err(AppError::Validation(format!(
                    "new entries cannot start as {}",
                    other.as_str()
                )));
            }
        }
        require_not_future(input.activity_date, self.today_for(&input.student_id).await?)?;

        let now = Utc::now().fixed_offset();
        let mut model = log_entry::ActiveModel {
            id: Set(self.id_gen.generate()),
            student_id: Set(input.student_id),
            student_name: Set(input.student_name),
            activity_date: Set(input.activity_date),
            description: Set(input.description.trim().to_string()),
            status: Set(input.status),
            supervisor_feedback: Set(None),
            approved_by: Set(None),
            approved_at: Set(None),
            academic_reviewed_by: Set(None),
            academic_reviewed_at: Set(None),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        set_location(&mut model, input.location);
        log_entry::IndustrialConfirmation::Unset.apply(&mut model);

        let created = self.log_entry_repo.create(model).await?;
        tracing::info!(entry_id = %created.id, student_id = %created.student_id, status = created.status.as_str(), "Log entry created");
        Ok(created)
    }

    /// Get an entry by ID.
    pub async fn get(&self, id: &str) -> AppResult<log_entry::Model> {
        self.log_entry_repo.get_by_id(id).await
    }

    /// Apply a patch. A status change must follow the transition table, and
    /// moving to pending requires a description.
    pub async fn update(&self, id: &str, patch: LogEntryPatch) -> AppResult<log_entry::Model> {
        self.update_guarded(id, patch, |_| Ok(())).await
    }

    /// [`Self::update`], applied only while `guard` accepts the current row.
    pub async fn update_guarded<G>(
        &self,
        id: &str,
        patch: LogEntryPatch,
        guard: G,
    ) -> AppResult<log_entry::Model>
    where
        G: Fn(&log_entry::Model) -> AppResult<()>,
    {
        if let Some(date) = patch.activity_date {
            let entry = self.get(id).await?;
            require_not_future(date, self.today_for(&entry.student_id).await?)?;
        }

        self.mutate(id, |current| {
            guard(current)?;
            let mut changes = log_entry::ActiveModel::default();

            if let Some(date) = patch.activity_date {
                changes.activity_date = Set(date);
            }
            if let Some(description) = &patch.description {
                changes.description = Set(description.trim().to_string());
            }
            if let Some(location) = &patch.location {
                set_location(&mut changes, location.clone());
            }
            if let Some(name) = &patch.student_name {
                changes.student_name = Set(name.clone());
            }

            if let Some(next) = patch.status.filter(|s| *s != current.status) {
                if !current.status.can_transition_to(next) {
                    return Err(AppError::InvalidTransition(format!(
                        "cannot move entry from {} to {}",
                        current.status.as_str(),
                        next.as_str()
                    )));
                }
                if next == LogStatus::Pending {
                    let description = patch.description.as_deref().unwrap_or(&current.description);
                    require_description(description)?;
                }
                changes.status = Set(next);
            }

            Ok(changes)
        })
        .await
    }

    /// Compare-and-swap write.
    ///
    /// `build` sees the current row and returns the columns to change, or an
    /// error if the row no longer qualifies. `updated_at` is refreshed and
    /// never moves backwards.
    pub async fn mutate<F>(&self, id: &str, build: F) -> AppResult<log_entry::Model>
    where
        F: Fn(&log_entry::Model) -> AppResult<log_entry::ActiveModel>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.log_entry_repo.get_by_id(id).await?;
            let mut changes = build(&current)?;
            changes.updated_at = Set(Utc::now().fixed_offset().max(current.updated_at));

            if let Some(updated) = self
                .log_entry_repo
                .compare_and_swap(id, current.version, changes)
                .await?
            {
                return Ok(updated);
            }
            tracing::debug!(entry_id = %id, attempt, "Log entry changed concurrently, retrying");
        }

        Err(AppError::Conflict(format!(
            "log entry {id} is being modified concurrently"
        )))
    }

    /// Delete an entry if `check` accepts the current row.
    pub async fn delete_if<F>(&self, id: &str, check: F) -> AppResult<log_entry::Model>
    where
        F: Fn(&log_entry::Model) -> AppResult<()>,
    {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let current = self.log_entry_repo.get_by_id(id).await?;
            check(&current)?;

            if self
                .log_entry_repo
                .delete_if_version(id, current.version)
                .await?
            {
                tracing::info!(entry_id = %id, student_id = %current.student_id, "Log entry deleted");
                return Ok(current);
            }
        }

        Err(AppError::Conflict(format!(
            "log entry {id} is being modified concurrently"
        )))
    }

    /// Delete an entry regardless of its state.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.delete_if(id, |_| Ok(())).await.map(|_| ())
    }

    /// A student's entries, newest activity date first.
    pub async fn list_for_student(&self, student_id: &str) -> AppResult<Vec<log_entry::Model>> {
        self.log_entry_repo.find_by_student(student_id).await
    }

    /// Entries of the given students, optionally limited to some statuses.
    pub async fn list_for_students(
        &self,
        student_ids: &[String],
        statuses: Option<&[LogStatus]>,
    ) -> AppResult<Vec<log_entry::Model>> {
        self.log_entry_repo
            .find_by_students(student_ids, statuses)
            .await
    }

    /// Every entry, optionally limited to some statuses.
    pub async fn list_all(&self, statuses: Option<&[LogStatus]>) -> AppResult<Vec<log_entry::Model>> {
        self.log_entry_repo.find_all(statuses).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use logbook_db::entities::user::{self, UserRole};
    use logbook_db::test_utils::TestDatabase;

    async fn setup() -> (TestDatabase, LogEntryService) {
        let db = TestDatabase::new().await.unwrap();
        UserRepository::new(db.connection())
            .create(user::ActiveModel {
                id: Set("s1".to_string()),
                email: Set("s1@example.edu".to_string()),
                name: Set("Ada Obi".to_string()),
                role: Set(UserRole::Student),
                is_active: Set(true),
                created_at: Set(Utc::now().fixed_offset()),
                ..Default::default()
            })
            .await
            .unwrap();
        let service = LogEntryService::new(
            LogEntryRepository::new(db.connection()),
            UserRepository::new(db.connection()),
            chrono_tz::UTC,
        );
        (db, service)
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn new_entry(status: LogStatus, description: &str) -> NewLogEntry {
        NewLogEntry {
            student_id: "s1".to_string(),
            student_name: "Ada Obi".to_string(),
            activity_date: today(),
            description: description.to_string(),
            location: None,
            status,
        }
    }

    #[tokio::test]
    async fn test_create_rules() {
        let (_db, store) = setup().await;

        let draft = store.create(new_entry(LogStatus::Draft, "")).await.unwrap();
        assert_eq!(draft.status, LogStatus::Draft);
        assert_eq!(draft.version, 0);
        assert_eq!(draft.created_at, draft.updated_at);

        let empty_pending = store.create(new_entry(LogStatus::Pending, "   ")).await;
        assert!(matches!(empty_pending, Err(AppError::Validation(_))));

        let approved = store.create(new_entry(LogStatus::Approved, "x")).await;
        assert!(matches!(approved, Err(AppError::Validation(_))));

        let mut future = new_entry(LogStatus::Draft, "x");
        future.activity_date = today() + Duration::days(2);
        assert!(matches!(
            store.create(future).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_enforces_transition_table() {
        let (_db, store) = setup().await;
        let entry = store.create(new_entry(LogStatus::Draft, "")).await.unwrap();

        let to_approved = store
            .update(
                &entry.id,
                LogEntryPatch {
                    status: Some(LogStatus::Approved),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(to_approved, Err(AppError::InvalidTransition(_))));

        // Submitting without a description fails validation.
        let empty_submit = store
            .update(
                &entry.id,
                LogEntryPatch {
                    status: Some(LogStatus::Pending),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(empty_submit, Err(AppError::Validation(_))));

        let submitted = store
            .update(
                &entry.id,
                LogEntryPatch {
                    description: Some("Worked on API integration".to_string()),
                    status: Some(LogStatus::Pending),
                    location: Some(Some(EntryLocation {
                        latitude: 6.5,
                        longitude: 3.3,
                        address: Some("Yaba".to_string()),
                    })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(submitted.status, LogStatus::Pending);
        assert_eq!(submitted.version, 1);
        assert!(submitted.updated_at >= entry.updated_at);
        assert_eq!(submitted.location().unwrap().address.as_deref(), Some("Yaba"));

        let cleared = store
            .update(
                &entry.id,
                LogEntryPatch {
                    location: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.location().is_none());
        assert_eq!(cleared.version, 2);
    }

    #[tokio::test]
    async fn test_update_unknown_entry() {
        let (_db, store) = setup().await;
        let result = store.update("missing", LogEntryPatch::default()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mutate_rechecks_precondition_on_each_attempt() {
        let (_db, store) = setup().await;
        let entry = store
            .create(new_entry(LogStatus::Pending, "Site visit"))
            .await
            .unwrap();

        let approve = |current: &log_entry::Model| {
            if current.status != LogStatus::Pending {
                return Err(AppError::InvalidTransition("not pending".to_string()));
            }
            Ok(log_entry::ActiveModel {
                status: Set(LogStatus::Approved),
                ..Default::default()
            })
        };

        let (first, second) = tokio::join!(store.mutate(&entry.id, approve), store.mutate(&entry.id, approve));
        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(AppError::InvalidTransition(_))))
        );
    }

    #[tokio::test]
    async fn test_delete_if_and_lists() {
        let (_db, store) = setup().await;
        let keep = store
            .create(new_entry(LogStatus::Pending, "Keep me"))
            .await
            .unwrap();
        let mut older = new_entry(LogStatus::Draft, "");
        older.activity_date = today() - Duration::days(3);
        let drop = store.create(older).await.unwrap();

        let listed = store.list_for_student("s1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, keep.id);

        let refused = store
            .delete_if(&keep.id, |e| {
                if e.status.is_editable() {
                    Ok(())
                } else {
                    Err(AppError::InvalidTransition("locked".to_string()))
                }
            })
            .await;
        assert!(matches!(refused, Err(AppError::InvalidTransition(_))));

        store.delete(&drop.id).await.unwrap();
        assert!(matches!(store.get(&drop.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(store.delete(&drop.id).await, Err(AppError::NotFound(_))));

        let pending = store
            .list_for_students(&["s1".to_string()], Some(&[LogStatus::Pending]))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }
}
