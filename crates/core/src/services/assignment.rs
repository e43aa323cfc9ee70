//! Supervisor assignment registry.

use std::collections::HashSet;

use chrono::Utc;
use logbook_common::{AppError, AppResult, IdGenerator};
use logbook_db::{
    entities::{
        assignment::{self, SupervisorType},
        user::{self, UserRole},
    },
    repositories::{AssignmentRepository, UserRepository},
};
use sea_orm::Set;

/// Assignment registry for business logic.
#[derive(Clone)]
pub struct AssignmentService {
    assignment_repo: AssignmentRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl AssignmentService {
    /// Create a new assignment service.
    #[must_use]
    pub const fn new(assignment_repo: AssignmentRepository, user_repo: UserRepository) -> Self {
        Self {
            assignment_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Make `supervisor_id` the active supervisor of the given type for a
    /// student. A previous active assignment of that type is deactivated.
    pub async fn assign(
        &self,
        student_id: &str,
        supervisor_id: &str,
        assigned_by: &str,
        supervisor_type: SupervisorType,
    ) -> AppResult<assignment::Model> {
        let admin = self.user_repo.get_by_id(assigned_by).await?;
        if admin.role != UserRole::Admin {
            return Err(AppError::Unauthorized(
                "Only admins can assign supervisors".to_string(),
            ));
        }

        let student = self.user_repo.get_by_id(student_id).await?;
        if student.role != UserRole::Student {
            return Err(AppError::Validation(format!(
                "user {student_id} is not a student"
            )));
        }

        let supervisor = self.user_repo.get_by_id(supervisor_id).await?;
        if !supervisor.role.supervises(supervisor_type) {
            return Err(AppError::Validation(format!(
                "user {supervisor_id} cannot be a {supervisor_type:?} supervisor"
            )));
        }
        if !supervisor.is_active {
            return Err(AppError::Validation(format!(
                "user {supervisor_id} is deactivated"
            )));
        }

        let model = assignment::ActiveModel {
            id: Set(self.id_gen.generate()),
            student_id: Set(student.id),
            supervisor_id: Set(supervisor.id),
            supervisor_type: Set(supervisor_type),
            assigned_by: Set(admin.id),
            assigned_at: Set(Utc::now().fixed_offset()),
            is_active: Set(true),
            deactivated_at: Set(None),
        };

        let created = self.assignment_repo.replace_active(model).await?;
        tracing::info!(
            assignment_id = %created.id,
            student_id = %created.student_id,
            supervisor_id = %created.supervisor_id,
            supervisor_type = ?created.supervisor_type,
            "Supervisor assigned"
        );
        Ok(created)
    }

    /// Deactivate an assignment. Unassigning twice is not an error.
    pub async fn unassign(&self, assignment_id: &str) -> AppResult<assignment::Model> {
        let updated = self.assignment_repo.deactivate(assignment_id).await?;
        tracing::info!(assignment_id = %assignment_id, student_id = %updated.student_id, "Supervisor unassigned");
        Ok(updated)
    }

    /// [`Self::unassign`] on behalf of an admin.
    pub async fn unassign_as(&self, actor_id: &str, assignment_id: &str) -> AppResult<assignment::Model> {
        self.require_admin(actor_id).await?;
        self.unassign(assignment_id).await
    }

    /// The active supervisor of a type for a student.
    pub async fn active_supervisor_for(
        &self,
        student_id: &str,
        supervisor_type: SupervisorType,
    ) -> AppResult<Option<String>> {
        Ok(self
            .assignment_repo
            .find_active(student_id, supervisor_type)
            .await?
            .map(|a| a.supervisor_id))
    }

    /// Whether `supervisor_id` is the active supervisor of that type for the
    /// student.
    pub async fn is_active_supervisor(
        &self,
        supervisor_id: &str,
        student_id: &str,
        supervisor_type: SupervisorType,
    ) -> AppResult<bool> {
        Ok(self
            .active_supervisor_for(student_id, supervisor_type)
            .await?
            .is_some_and(|id| id == supervisor_id))
    }

    /// Students actively supervised by `supervisor_id` in the given role.
    pub async fn students_for(
        &self,
        supervisor_id: &str,
        supervisor_type: SupervisorType,
    ) -> AppResult<HashSet<String>> {
        Ok(self
            .assignment_repo
            .find_active_for_supervisor(supervisor_id, Some(supervisor_type))
            .await?
            .into_iter()
            .map(|a| a.student_id)
            .collect())
    }

    /// Every assignment of a student, newest first.
    pub async fn history_for_student(&self, student_id: &str) -> AppResult<Vec<assignment::Model>> {
        self.assignment_repo.find_history(student_id).await
    }

    /// Page through active assignments.
    pub async fn list_active(&self, limit: u64, offset: u64) -> AppResult<Vec<assignment::Model>> {
        self.assignment_repo
            .find_all_active(limit.min(100), offset)
            .await
    }

    /// Whether `actor` may see the data of `student_id`: admins, the
    /// student, and any active supervisor of the student.
    pub async fn can_view_student(&self, actor: &user::Model, student_id: &str) -> AppResult<bool> {
        match actor.role {
            UserRole::Admin => Ok(true),
            UserRole::Student => Ok(actor.id == student_id),
            UserRole::AcademicSupervisor => {
                self.is_active_supervisor(&actor.id, student_id, SupervisorType::Academic)
                    .await
            }
            UserRole::IndustrialSupervisor => {
                self.is_active_supervisor(&actor.id, student_id, SupervisorType::Industrial)
                    .await
            }
        }
    }

    async fn require_admin(&self, actor_id: &str) -> AppResult<()> {
        let actor = self.user_repo.get_by_id(actor_id).await?;
        if actor.role != UserRole::Admin {
            return Err(AppError::Unauthorized(
                "Only admins can manage assignments".to_string(),
            ));
        }
        Ok(())
    }
}
