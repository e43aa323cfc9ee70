//! Assignment repository.

use std::sync::Arc;

use crate::entities::{Assignment, User, assignment, user};
use assignment::SupervisorType;
use chrono::Utc;
use logbook_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};

/// Assignment repository for database operations.
#[derive(Clone)]
pub struct AssignmentRepository {
    db: Arc<DatabaseConnection>,
}

fn db_err(e: sea_orm::DbErr) -> AppError {
    AppError::Database(e.to_string())
}

/// Column on `user` that mirrors the active assignment of a type.
const fn mirror_column(supervisor_type: SupervisorType) -> user::Column {
    match supervisor_type {
        SupervisorType::Academic => user::Column::AssignedSupervisorId,
        SupervisorType::Industrial => user::Column::AssignedIndustrialSupervisorId,
    }
}

impl AssignmentRepository {
    /// Create a new assignment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an assignment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<assignment::Model>> {
        Assignment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Find an assignment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<assignment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("assignment {id}")))
    }

    /// The active assignment of a student for one supervisor type.
    pub async fn find_active(
        &self,
        student_id: &str,
        supervisor_type: SupervisorType,
    ) -> AppResult<Option<assignment::Model>> {
        Assignment::find()
            .filter(assignment::Column::StudentId.eq(student_id))
            .filter(assignment::Column::SupervisorType.eq(supervisor_type))
            .filter(assignment::Column::IsActive.eq(true))
            .order_by_desc(assignment::Column::AssignedAt)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Active assignments held by a supervisor.
    pub async fn find_active_for_supervisor(
        &self,
        supervisor_id: &str,
        supervisor_type: Option<SupervisorType>,
    ) -> AppResult<Vec<assignment::Model>> {
        let mut query = Assignment::find()
            .filter(assignment::Column::SupervisorId.eq(supervisor_id))
            .filter(assignment::Column::IsActive.eq(true));

        if let Some(kind) = supervisor_type {
            query = query.filter(assignment::Column::SupervisorType.eq(kind));
        }

        query
            .order_by_asc(assignment::Column::AssignedAt)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// All assignments of a student, active or not, newest first.
    pub async fn find_history(&self, student_id: &str) -> AppResult<Vec<assignment::Model>> {
        Assignment::find()
            .filter(assignment::Column::StudentId.eq(student_id))
            .order_by_desc(assignment::Column::AssignedAt)
            .order_by_desc(assignment::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Page through every active assignment.
    pub async fn find_all_active(&self, limit: u64, offset: u64) -> AppResult<Vec<assignment::Model>> {
        Assignment::find()
            .filter(assignment::Column::IsActive.eq(true))
            .order_by_desc(assignment::Column::AssignedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Make `model` the only active assignment of its type for its student.
    ///
    /// Runs in one transaction: deactivates the current active row (kept for
    /// history), inserts the new row and refreshes the mirror column on the
    /// student.
    pub async fn replace_active(
        &self,
        model: assignment::ActiveModel,
    ) -> AppResult<assignment::Model> {
        let student_id = model
            .student_id
            .clone()
            .take()
            .ok_or_else(|| AppError::Internal("assignment without student_id".to_string()))?;
        let supervisor_id = model
            .supervisor_id
            .clone()
            .take()
            .ok_or_else(|| AppError::Internal("assignment without supervisor_id".to_string()))?;
        let supervisor_type = model
            .supervisor_type
            .clone()
            .take()
            .ok_or_else(|| AppError::Internal("assignment without supervisor_type".to_string()))?;

        let txn = self.db.begin().await.map_err(db_err)?;

        Self::deactivate_active(&txn, &student_id, supervisor_type).await?;
        let inserted = model.insert(&txn).await.map_err(db_err)?;
        Self::set_mirror(&txn, &student_id, supervisor_type, Some(supervisor_id)).await?;

        txn.commit().await.map_err(db_err)?;
        Ok(inserted)
    }

    /// Deactivate an assignment. Returns the row as stored afterwards.
    ///
    /// Deactivating an inactive row changes nothing.
    pub async fn deactivate(&self, id: &str) -> AppResult<assignment::Model> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let existing = Assignment::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("assignment {id}")))?;

        if !existing.is_active {
            txn.commit().await.map_err(db_err)?;
            return Ok(existing);
        }

        Assignment::update_many()
            .col_expr(assignment::Column::IsActive, Expr::value(false))
            .col_expr(
                assignment::Column::DeactivatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(assignment::Column::Id.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        // Only clear the mirror if it still points at this supervisor.
        User::update_many()
            .col_expr(
                mirror_column(existing.supervisor_type),
                Expr::value(Option::<String>::None),
            )
            .filter(user::Column::Id.eq(existing.student_id.as_str()))
            .filter(mirror_column(existing.supervisor_type).eq(existing.supervisor_id.as_str()))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let updated = Assignment::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound(format!("assignment {id}")))?;

        txn.commit().await.map_err(db_err)?;
        Ok(updated)
    }

    async fn deactivate_active<C: ConnectionTrait>(
        conn: &C,
        student_id: &str,
        supervisor_type: SupervisorType,
    ) -> AppResult<u64> {
        let result = Assignment::update_many()
            .col_expr(assignment::Column::IsActive, Expr::value(false))
            .col_expr(
                assignment::Column::DeactivatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(assignment::Column::StudentId.eq(student_id))
            .filter(assignment::Column::SupervisorType.eq(supervisor_type))
            .filter(assignment::Column::IsActive.eq(true))
            .exec(conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    async fn set_mirror<C: ConnectionTrait>(
        conn: &C,
        student_id: &str,
        supervisor_type: SupervisorType,
        supervisor_id: Option<String>,
    ) -> AppResult<()> {
        User::update_many()
            .col_expr(mirror_column(supervisor_type), Expr::value(supervisor_id))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(user::Column::Id.eq(student_id))
            .exec(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
