//! Supervisor assignment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which side of the placement a supervisor represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SupervisorType {
    #[sea_orm(string_value = "academic")]
    Academic,
    #[sea_orm(string_value = "industrial")]
    Industrial,
}

/// Student to supervisor mapping.
///
/// Rows are never deleted. Reassignment deactivates the previous row, so the
/// table doubles as assignment history. At most one row per
/// (`student_id`, `supervisor_type`) is active.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assignment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub student_id: String,

    pub supervisor_id: String,

    pub supervisor_type: SupervisorType,

    /// Admin who created the assignment
    pub assigned_by: String,

    pub assigned_at: DateTimeWithTimeZone,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    #[sea_orm(nullable)]
    pub deactivated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Student,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SupervisorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Supervisor,
}

impl ActiveModelBehavior for ActiveModel {}
