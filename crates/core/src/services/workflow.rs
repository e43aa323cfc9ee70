//! Log entry confirmation workflow.
//!
//! Each entry moves through two confirmation tracks on top of its status:
//!
//! 1. the academic supervisor approves or rejects a pending entry,
//! 2. the industrial supervisor confirms (with a rating) or declines an
//!    approved entry,
//! 3. the academic supervisor marks a confirmed entry as reviewed.
//!
//! Every call takes the acting user explicitly. The actor is checked before
//! the input, and the input before the entry's state, so a wrong actor always
//! sees [`AppError::Unauthorized`] and a right actor at the wrong time sees
//! [`AppError::InvalidTransition`].

use chrono::{NaiveDate, Utc};
use logbook_common::{AppError, AppResult, Coordinates};
use logbook_db::entities::{
    assignment::SupervisorType,
    log_entry::{self, AcademicReview, EntryLocation, IndustrialConfirmation, LogStatus, Rating},
    notification::NotificationKind,
    user::{self, UserRole},
};
use sea_orm::Set;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::services::assignment::AssignmentService;
use crate::services::event_publisher::{DomainEvent, EventPublisherService, publish_quietly};
use crate::services::log_entry::{LogEntryPatch, LogEntryService, NewLogEntry};
use crate::services::notification::NotificationService;
use crate::services::user::UserService;

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Input for writing a new entry.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitLogEntryInput {
    pub activity_date: NaiveDate,

    #[validate(length(max = 10000))]
    #[serde(default)]
    pub description: String,

    pub location: Option<EntryLocation>,

    /// `false` keeps the entry as a draft.
    #[serde(default)]
    pub submit: bool,
}

/// Input for editing an entry.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditLogEntryInput {
    pub activity_date: Option<NaiveDate>,

    #[validate(length(max = 10000))]
    pub description: Option<String>,

    /// `null` clears the location, an absent field keeps it.
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<EntryLocation>>,

    /// Submit (or resubmit) the entry after editing.
    #[serde(default)]
    pub submit: bool,
}

/// Academic decision on a pending entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

fn validate_location(location: Option<&EntryLocation>) -> AppResult<()> {
    if let Some(loc) = location {
        Coordinates::new(loc.latitude, loc.longitude)?;
    }
    Ok(())
}

fn normalize_feedback(feedback: Option<String>) -> Option<String> {
    feedback
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
}

fn require_editable(entry: &log_entry::Model) -> AppResult<()> {
    if entry.status.is_editable() {
        Ok(())
    } else {
        Err(AppError::InvalidTransition(format!(
            "entry is {} and can no longer be changed",
            entry.status.as_str()
        )))
    }
}

/// Workflow service for business logic.
#[derive(Clone)]
pub struct WorkflowService {
    entries: LogEntryService,
    assignments: AssignmentService,
    users: UserService,
    notifications: NotificationService,
    event_publisher: Option<EventPublisherService>,
}

impl WorkflowService {
    /// Create a new workflow service.
    #[must_use]
    pub const fn new(
        entries: LogEntryService,
        assignments: AssignmentService,
        users: UserService,
        notifications: NotificationService,
    ) -> Self {
        Self {
            entries,
            assignments,
            users,
            notifications,
            event_publisher: None,
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    async fn published(&self, entry: log_entry::Model) -> log_entry::Model {
        publish_quietly(
            self.event_publisher.as_ref(),
            DomainEvent::LogEntryChanged {
                entry_id: entry.id.clone(),
                student_id: entry.student_id.clone(),
                status: entry.status,
            },
        )
        .await;
        entry
    }

    async fn require_student(&self, actor_id: &str) -> AppResult<user::Model> {
        let actor = self.users.get_active(actor_id).await?;
        if actor.role != UserRole::Student {
            return Err(AppError::Unauthorized(
                "Only students keep a logbook".to_string(),
            ));
        }
        Ok(actor)
    }

    fn require_owner(actor: &user::Model, entry: &log_entry::Model) -> AppResult<()> {
        if entry.student_id != actor.id {
            return Err(AppError::Unauthorized(
                "Only the owning student can change this entry".to_string(),
            ));
        }
        Ok(())
    }

    /// Load an entry and check that `actor_id` is the student's active
    /// supervisor of the given type.
    async fn require_supervisor(
        &self,
        entry_id: &str,
        actor_id: &str,
        supervisor_type: SupervisorType,
    ) -> AppResult<(user::Model, log_entry::Model)> {
        let actor = self.users.get_active(actor_id).await?;
        let entry = self.entries.get(entry_id).await?;
        if !self
            .assignments
            .is_active_supervisor(&actor.id, &entry.student_id, supervisor_type)
            .await?
        {
            return Err(AppError::Unauthorized(format!(
                "Only the assigned {} supervisor can do this",
                match supervisor_type {
                    SupervisorType::Academic => "academic",
                    SupervisorType::Industrial => "industrial",
                }
            )));
        }
        Ok((actor, entry))
    }

    async fn notify_supervisor(
        &self,
        student_id: &str,
        supervisor_type: SupervisorType,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) {
        match self
            .assignments
            .active_supervisor_for(student_id, supervisor_type)
            .await
        {
            Ok(Some(supervisor_id)) => {
                self.notifications
                    .notify_quietly(&supervisor_id, kind, title, message)
                    .await;
            }
            Ok(None) => {
                tracing::debug!(student_id = %student_id, supervisor_type = ?supervisor_type, "No supervisor to notify");
            }
            Err(e) => {
                tracing::warn!(error = %e, student_id = %student_id, "Failed to look up supervisor for notification");
            }
        }
    }

    /// Write a new entry, as a draft or submitted for review.
    pub async fn submit_log_entry(
        &self,
        actor_id: &str,
        input: SubmitLogEntryInput,
    ) -> AppResult<log_entry::Model> {
        let student = self.require_student(actor_id).await?;
        input.validate()?;
        validate_location(input.location.as_ref())?;

        let status = if input.submit {
            LogStatus::Pending
        } else {
            LogStatus::Draft
        };

        let entry = self
            .entries
            .create(NewLogEntry {
                student_id: student.id.clone(),
                student_name: student.name.clone(),
                activity_date: input.activity_date,
                description: input.description,
                location: input.location,
                status,
            })
            .await?;

        if entry.status == LogStatus::Pending {
            self.notify_supervisor(
                &student.id,
                SupervisorType::Academic,
                NotificationKind::Info,
                "New Log Entry Submitted",
                &format!(
                    "{} submitted a log entry for {}",
                    student.name, entry.activity_date
                ),
            )
            .await;
        }

        Ok(self.published(entry).await)
    }

    /// Edit a draft or rejected entry, optionally submitting it.
    ///
    /// Feedback from a previous rejection stays on the entry until the next
    /// decision overwrites it.
    pub async fn edit_log_entry(
        &self,
        actor_id: &str,
        entry_id: &str,
        input: EditLogEntryInput,
    ) -> AppResult<log_entry::Model> {
        let student = self.require_student(actor_id).await?;
        let entry = self.entries.get(entry_id).await?;
        Self::require_owner(&student, &entry)?;
        input.validate()?;
        validate_location(input.location.as_ref().and_then(Option::as_ref))?;

        let was_rejected = entry.status == LogStatus::Rejected;
        let patch = LogEntryPatch {
            activity_date: input.activity_date,
            description: input.description,
            location: input.location,
            status: input.submit.then_some(LogStatus::Pending),
            student_name: Some(student.name.clone()),
        };

        let updated = self
            .entries
            .update_guarded(entry_id, patch, require_editable)
            .await?;

        if input.submit {
            tracing::info!(entry_id = %updated.id, resubmitted = was_rejected, "Log entry submitted");
            let title = if was_rejected {
                "Log Entry Resubmitted"
            } else {
                "New Log Entry Submitted"
            };
            self.notify_supervisor(
                &student.id,
                SupervisorType::Academic,
                NotificationKind::Info,
                title,
                &format!(
                    "{} submitted a log entry for {}",
                    student.name, updated.activity_date
                ),
            )
            .await;
        }

        Ok(self.published(updated).await)
    }

    /// Delete a draft or rejected entry.
    pub async fn delete_log_entry(&self, actor_id: &str, entry_id: &str) -> AppResult<()> {
        let student = self.require_student(actor_id).await?;
        let entry = self.entries.get(entry_id).await?;
        Self::require_owner(&student, &entry)?;

        let deleted = self.entries.delete_if(entry_id, require_editable).await?;

        publish_quietly(
            self.event_publisher.as_ref(),
            DomainEvent::LogEntryDeleted {
                entry_id: deleted.id,
                student_id: deleted.student_id,
            },
        )
        .await;
        Ok(())
    }

    /// A student's own entries, newest first.
    pub async fn list_my_log_entries(&self, student_id: &str) -> AppResult<Vec<log_entry::Model>> {
        self.entries.list_for_student(student_id).await
    }

    /// One entry, if `actor_id` may see it.
    ///
    /// Industrial supervisors only see approved entries; anything else is
    /// reported as missing.
    pub async fn get_entry(&self, actor_id: &str, entry_id: &str) -> AppResult<log_entry::Model> {
        let actor = self.users.get_active(actor_id).await?;
        let entry = self.entries.get(entry_id).await?;

        if !self
            .assignments
            .can_view_student(&actor, &entry.student_id)
            .await?
        {
            return Err(AppError::Unauthorized(
                "Entry belongs to a student you do not supervise".to_string(),
            ));
        }
        if actor.role == UserRole::IndustrialSupervisor && entry.status != LogStatus::Approved {
            return Err(AppError::NotFound(format!("log entry {entry_id}")));
        }
        Ok(entry)
    }

    /// Entries waiting on `actor_id`.
    ///
    /// Academic supervisors see submitted entries not yet marked reviewed.
    /// Industrial supervisors see approved entries they have not decided yet.
    /// Admins see everything.
    pub async fn review_queue(&self, actor_id: &str) -> AppResult<Vec<log_entry::Model>> {
        let actor = self.users.get_active(actor_id).await?;

        match actor.role {
            UserRole::Admin => self.entries.list_all(None).await,
            UserRole::AcademicSupervisor => {
                let students: Vec<String> = self
                    .assignments
                    .students_for(&actor.id, SupervisorType::Academic)
                    .await?
                    .into_iter()
                    .collect();
                let entries = self
                    .entries
                    .list_for_students(
                        &students,
                        Some(&[LogStatus::Pending, LogStatus::Approved, LogStatus::Rejected]),
                    )
                    .await?;
                Ok(entries
                    .into_iter()
                    .filter(|e| e.academic_review().is_unset())
                    .collect())
            }
            UserRole::IndustrialSupervisor => {
                let students: Vec<String> = self
                    .assignments
                    .students_for(&actor.id, SupervisorType::Industrial)
                    .await?
                    .into_iter()
                    .collect();
                let entries = self
                    .entries
                    .list_for_students(&students, Some(&[LogStatus::Approved]))
                    .await?;
                Ok(entries
                    .into_iter()
                    .filter(|e| matches!(e.industrial_confirmation(), Ok(c) if c.is_unset()))
                    .collect())
            }
            UserRole::Student => Err(AppError::Unauthorized(
                "Students have no review queue".to_string(),
            )),
        }
    }

    /// Academic approval or rejection of a pending entry.
    pub async fn review_log_entry(
        &self,
        entry_id: &str,
        actor_id: &str,
        decision: ReviewDecision,
        feedback: Option<String>,
    ) -> AppResult<log_entry::Model> {
        let (supervisor, entry) = self
            .require_supervisor(entry_id, actor_id, SupervisorType::Academic)
            .await?;

        let feedback = normalize_feedback(feedback);
        if decision == ReviewDecision::Reject && feedback.is_none() {
            return Err(AppError::Validation(
                "feedback is required when rejecting an entry".to_string(),
            ));
        }

        let updated = self
            .entries
            .mutate(entry_id, |current| {
                if current.status != LogStatus::Pending {
                    return Err(AppError::InvalidTransition(format!(
                        "only pending entries can be reviewed, entry is {}",
                        current.status.as_str()
                    )));
                }

                let mut changes = log_entry::ActiveModel {
                    supervisor_feedback: Set(feedback.clone()),
                    ..Default::default()
                };
                match decision {
                    ReviewDecision::Approve => {
                        changes.status = Set(LogStatus::Approved);
                        changes.approved_by = Set(Some(supervisor.id.clone()));
                        changes.approved_at = Set(Some(Utc::now().fixed_offset()));
                    }
                    ReviewDecision::Reject => {
                        changes.status = Set(LogStatus::Rejected);
                    }
                }
                Ok(changes)
            })
            .await?;

        tracing::info!(entry_id = %updated.id, reviewer = %supervisor.id, status = updated.status.as_str(), "Log entry reviewed");

        let (kind, title, verb) = match decision {
            ReviewDecision::Approve => (NotificationKind::Success, "Log Entry Approved", "approved"),
            ReviewDecision::Reject => (NotificationKind::Warning, "Log Entry Rejected", "rejected"),
        };
        let mut message = format!(
            "Your log entry for {} was {verb} by {}",
            entry.activity_date, supervisor.name
        );
        if let Some(feedback) = &feedback {
            message.push_str(&format!(": {feedback}"));
        }
        self.notifications
            .notify_quietly(&entry.student_id, kind, title, &message)
            .await;

        if decision == ReviewDecision::Approve {
            self.notify_supervisor(
                &entry.student_id,
                SupervisorType::Industrial,
                NotificationKind::Info,
                "Log Entry Awaiting Confirmation",
                &format!(
                    "{}'s log entry for {} is ready for confirmation",
                    entry.student_name, entry.activity_date
                ),
            )
            .await;
        }

        Ok(self.published(updated).await)
    }

    /// Industrial decision on an approved entry. A rating (1 to 5) is
    /// required when confirming and not allowed otherwise.
    pub async fn confirm_industrial(
        &self,
        entry_id: &str,
        actor_id: &str,
        confirmed: bool,
        feedback: Option<String>,
        rating: Option<i32>,
    ) -> AppResult<log_entry::Model> {
        let (supervisor, entry) = self
            .require_supervisor(entry_id, actor_id, SupervisorType::Industrial)
            .await?;

        let rating = match (confirmed, rating) {
            (true, Some(value)) => Some(Rating::try_from(value)?),
            (true, None) => {
                return Err(AppError::Validation(
                    "a rating is required to confirm an entry".to_string(),
                ));
            }
            (false, Some(_)) => {
                return Err(AppError::Validation(
                    "a rating is only given when confirming".to_string(),
                ));
            }
            (false, None) => None,
        };
        let feedback = normalize_feedback(feedback);

        let updated = self
            .entries
            .mutate(entry_id, |current| {
                if current.status != LogStatus::Approved {
                    return Err(AppError::InvalidTransition(format!(
                        "only approved entries can be confirmed, entry is {}",
                        current.status.as_str()
                    )));
                }
                if !current.industrial_confirmation()?.is_unset() {
                    return Err(AppError::InvalidTransition(
                        "entry already has an industrial decision".to_string(),
                    ));
                }

                let at = Utc::now().fixed_offset();
                let by = supervisor.id.clone();
                let feedback = feedback.clone();
                let track = match rating {
                    Some(rating) => IndustrialConfirmation::Confirmed {
                        by,
                        at,
                        feedback,
                        rating,
                    },
                    None => IndustrialConfirmation::NotConfirmed { by, at, feedback },
                };

                let mut changes = log_entry::ActiveModel::default();
                track.apply(&mut changes);
                Ok(changes)
            })
            .await?;

        tracing::info!(entry_id = %updated.id, supervisor = %supervisor.id, confirmed, "Industrial decision recorded");

        let (kind, title, verb) = if confirmed {
            (NotificationKind::Success, "Log Entry Confirmed", "confirmed")
        } else {
            (NotificationKind::Warning, "Log Entry Not Confirmed", "not confirmed")
        };
        let message = format!(
            "The log entry for {} was {verb} by {}",
            entry.activity_date, supervisor.name
        );
        self.notifications
            .notify_quietly(&entry.student_id, kind, title, &message)
            .await;
        self.notify_supervisor(
            &entry.student_id,
            SupervisorType::Academic,
            kind,
            title,
            &format!("{} ({})", message, entry.student_name),
        )
        .await;

        Ok(self.published(updated).await)
    }

    /// Final academic acknowledgment of an industrially confirmed entry.
    pub async fn mark_academic_reviewed(
        &self,
        entry_id: &str,
        actor_id: &str,
    ) -> AppResult<log_entry::Model> {
        let (supervisor, entry) = self
            .require_supervisor(entry_id, actor_id, SupervisorType::Academic)
            .await?;

        let updated = self
            .entries
            .mutate(entry_id, |current| {
                if !current.industrial_confirmation()?.is_confirmed() {
                    return Err(AppError::InvalidTransition(
                        "entry must be confirmed by the industrial supervisor first".to_string(),
                    ));
                }
                if !current.academic_review().is_unset() {
                    return Err(AppError::InvalidTransition(
                        "entry is already marked as reviewed".to_string(),
                    ));
                }

                let mut changes = log_entry::ActiveModel::default();
                AcademicReview::Reviewed {
                    by: supervisor.id.clone(),
                    at: Utc::now().fixed_offset(),
                }
                .apply(&mut changes);
                Ok(changes)
            })
            .await?;

        tracing::info!(entry_id = %updated.id, reviewer = %supervisor.id, "Log entry marked as reviewed");

        self.notifications
            .notify_quietly(
                &entry.student_id,
                NotificationKind::Success,
                "Log Entry Reviewed",
                &format!(
                    "Your log entry for {} has been fully reviewed",
                    entry.activity_date
                ),
            )
            .await;

        Ok(self.published(updated).await)
    }
}
