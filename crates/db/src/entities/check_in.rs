//! Attendance check-in entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome recorded for a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Geofence result stored alongside a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    #[sea_orm(string_value = "on_site")]
    OnSite,
    #[sea_orm(string_value = "off_site")]
    OffSite,
}

impl From<logbook_common::SiteClassification> for SiteStatus {
    fn from(value: logbook_common::SiteClassification) -> Self {
        match value {
            logbook_common::SiteClassification::OnSite => Self::OnSite,
            logbook_common::SiteClassification::OffSite => Self::OffSite,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "check_in")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub student_id: String,

    /// Display name at the time of the check-in
    pub student_name: String,

    /// Stored in UTC
    pub checked_in_at: DateTimeWithTimeZone,

    /// Calendar day of `checked_in_at` in the student's timezone
    pub local_date: Date,

    pub latitude: f64,

    pub longitude: f64,

    #[sea_orm(column_type = "Text")]
    pub address: String,

    pub status: CheckInStatus,

    pub is_automatic: bool,

    /// Distance to the registered placement location, when known
    #[sea_orm(nullable)]
    pub distance_meters: Option<f64>,

    #[sea_orm(nullable)]
    pub site_status: Option<SiteStatus>,

    /// Equals `local_date` for automatic rows and NULL otherwise.
    /// Unique together with `student_id`.
    #[sea_orm(nullable)]
    pub auto_day: Option<Date>,
}

impl Model {
    /// The recorded position.
    #[must_use]
    pub const fn coordinates(&self) -> logbook_common::Coordinates {
        logbook_common::Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
