//! Log entry repository.

use std::sync::Arc;

use crate::entities::{LogEntry, log_entry};
use log_entry::LogStatus;
use logbook_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder,
};

/// Log entry repository for database operations.
#[derive(Clone)]
pub struct LogEntryRepository {
    db: Arc<DatabaseConnection>,
}

impl LogEntryRepository {
    /// Create a new log entry repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an entry by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<log_entry::Model>> {
        LogEntry::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an entry by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<log_entry::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("log entry {id}")))
    }

    /// Insert a new entry.
    pub async fn create(&self, model: log_entry::ActiveModel) -> AppResult<log_entry::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Write the set fields of `changes` only if the stored row still has
    /// `expected_version`, bumping the version.
    ///
    /// Returns `None` when the row is gone or was changed in between.
    pub async fn compare_and_swap(
        &self,
        id: &str,
        expected_version: i32,
        mut changes: log_entry::ActiveModel,
    ) -> AppResult<Option<log_entry::Model>> {
        changes.version = Set(expected_version + 1);

        let result = LogEntry::update_many()
            .set(changes)
            .filter(log_entry::Column::Id.eq(id))
            .filter(log_entry::Column::Version.eq(expected_version))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    /// Delete an entry if it still has `expected_version`.
    ///
    /// Returns whether a row was deleted.
    pub async fn delete_if_version(&self, id: &str, expected_version: i32) -> AppResult<bool> {
        let result = LogEntry::delete_many()
            .filter(log_entry::Column::Id.eq(id))
            .filter(log_entry::Column::Version.eq(expected_version))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// A student's entries, newest activity first.
    pub async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<log_entry::Model>> {
        LogEntry::find()
            .filter(log_entry::Column::StudentId.eq(student_id))
            .order_by_desc(log_entry::Column::ActivityDate)
            .order_by_desc(log_entry::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Entries of several students, optionally restricted to some statuses.
    pub async fn find_by_students(
        &self,
        student_ids: &[String],
        statuses: Option<&[LogStatus]>,
    ) -> AppResult<Vec<log_entry::Model>> {
        if student_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut query =
            LogEntry::find().filter(log_entry::Column::StudentId.is_in(student_ids.to_vec()));

        if let Some(statuses) = statuses {
            query = query.filter(log_entry::Column::Status.is_in(statuses.to_vec()));
        }

        query
            .order_by_desc(log_entry::Column::ActivityDate)
            .order_by_desc(log_entry::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every entry, optionally restricted to some statuses.
    pub async fn find_all(&self, statuses: Option<&[LogStatus]>) -> AppResult<Vec<log_entry::Model>> {
        let mut query = LogEntry::find();

        if let Some(statuses) = statuses {
            query = query.filter(log_entry::Column::Status.is_in(statuses.to_vec()));
        }

        query
            .order_by_desc(log_entry::Column::ActivityDate)
            .order_by_desc(log_entry::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
