//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a user. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "student")]
    Student,
    #[sea_orm(string_value = "academic_supervisor")]
    AcademicSupervisor,
    #[sea_orm(string_value = "industrial_supervisor")]
    IndustrialSupervisor,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl UserRole {
    /// Whether this role supervises students of the given kind.
    #[must_use]
    pub const fn supervises(self, supervisor_type: super::assignment::SupervisorType) -> bool {
        matches!(
            (self, supervisor_type),
            (Self::AcademicSupervisor, super::assignment::SupervisorType::Academic)
                | (Self::IndustrialSupervisor, super::assignment::SupervisorType::Industrial)
        )
    }

    #[must_use]
    pub const fn is_supervisor(self) -> bool {
        matches!(self, Self::AcademicSupervisor | Self::IndustrialSupervisor)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub email: String,

    pub name: String,

    pub role: UserRole,

    #[sea_orm(nullable)]
    pub institution: Option<String>,

    #[sea_orm(nullable)]
    pub department: Option<String>,

    /// Matriculation number (students only)
    #[sea_orm(nullable)]
    pub matric_number: Option<String>,

    /// Registered placement address (students only)
    #[sea_orm(column_type = "Text", nullable)]
    pub placement_address: Option<String>,

    /// Registered placement latitude, used for geofencing
    #[sea_orm(nullable)]
    pub placement_latitude: Option<f64>,

    /// Registered placement longitude, used for geofencing
    #[sea_orm(nullable)]
    pub placement_longitude: Option<f64>,

    /// IANA timezone; NULL = configured default
    #[sea_orm(nullable)]
    pub timezone: Option<String>,

    /// Active academic supervisor (mirrors the active assignment row)
    #[sea_orm(nullable)]
    pub assigned_supervisor_id: Option<String>,

    /// Active industrial supervisor (mirrors the active assignment row)
    #[sea_orm(nullable)]
    pub assigned_industrial_supervisor_id: Option<String>,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Registered placement coordinates, if both halves are set.
    #[must_use]
    pub fn placement_coordinates(&self) -> Option<logbook_common::Coordinates> {
        match (self.placement_latitude, self.placement_longitude) {
            (Some(lat), Some(lon)) => logbook_common::Coordinates::new(lat, lon).ok(),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::log_entry::Entity")]
    LogEntries,
    #[sea_orm(has_many = "super::check_in::Entity")]
    CheckIns,
    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
}

impl Related<super::log_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LogEntries.def()
    }
}

impl Related<super::check_in::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckIns.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
