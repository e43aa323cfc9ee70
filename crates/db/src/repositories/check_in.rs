//! Check-in repository.

use std::sync::Arc;

use crate::entities::{CheckIn, check_in};
use chrono::NaiveDate;
use logbook_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr,
};

/// Check-in repository for database operations.
#[derive(Clone)]
pub struct CheckInRepository {
    db: Arc<DatabaseConnection>,
}

/// Unique violations become [`AppError::Conflict`] so callers can tell a
/// lost race on the daily automatic slot apart from a broken database.
fn insert_err(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => AppError::Conflict(msg),
        _ => AppError::Database(e.to_string()),
    }
}

impl CheckInRepository {
    /// Create a new check-in repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a check-in.
    pub async fn create(&self, model: check_in::ActiveModel) -> AppResult<check_in::Model> {
        model.insert(self.db.as_ref()).await.map_err(insert_err)
    }

    /// The automatic check-in of a student on a calendar day, if any.
    pub async fn find_automatic_on(
        &self,
        student_id: &str,
        day: NaiveDate,
    ) -> AppResult<Option<check_in::Model>> {
        CheckIn::find()
            .filter(check_in::Column::StudentId.eq(student_id))
            .filter(check_in::Column::AutoDay.eq(day))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of manual check-ins of a student on a calendar day.
    pub async fn count_manual_on(&self, student_id: &str, day: NaiveDate) -> AppResult<u64> {
        CheckIn::find()
            .filter(check_in::Column::StudentId.eq(student_id))
            .filter(check_in::Column::LocalDate.eq(day))
            .filter(check_in::Column::IsAutomatic.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// A student's check-ins, newest first.
    pub async fn find_by_student(
        &self,
        student_id: &str,
        limit: u64,
    ) -> AppResult<Vec<check_in::Model>> {
        CheckIn::find()
            .filter(check_in::Column::StudentId.eq(student_id))
            .order_by_desc(check_in::Column::CheckedInAt)
            .order_by_desc(check_in::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The most recent check-in of a student.
    pub async fn find_latest(&self, student_id: &str) -> AppResult<Option<check_in::Model>> {
        CheckIn::find()
            .filter(check_in::Column::StudentId.eq(student_id))
            .order_by_desc(check_in::Column::CheckedInAt)
            .order_by_desc(check_in::Column::Id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
