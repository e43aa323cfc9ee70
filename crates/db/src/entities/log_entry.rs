//! Daily activity log entry entity.
//!
//! An entry carries three pieces of workflow state: its [`LogStatus`], the
//! industrial supervisor's decision and the academic supervisor's final
//! review mark. The latter two are stored as nullable columns and exposed as
//! the sum types [`IndustrialConfirmation`] and [`AcademicReview`].

use logbook_common::{AppError, AppResult};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

/// Status of a log entry.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    #[sea_orm(string_value = "draft")]
    #[default]
    Draft,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl LogStatus {
    /// Whether `self -> next` is a legal status change.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft | Self::Rejected, Self::Pending)
                | (Self::Pending, Self::Approved | Self::Rejected)
        )
    }

    /// Whether the owning student may still change or delete the entry.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Industrial supervisor rating, 1 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i32> for Rating {
    type Error = AppError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (i32::from(Self::MIN)..=i32::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(AppError::Validation(format!(
                "rating must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )))
        }
    }
}

impl From<Rating> for i32 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

/// The industrial supervisor's decision on an approved entry.
///
/// A rating only exists on a positive decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum IndustrialConfirmation {
    Unset,
    Confirmed {
        by: String,
        at: DateTimeWithTimeZone,
        feedback: Option<String>,
        rating: Rating,
    },
    NotConfirmed {
        by: String,
        at: DateTimeWithTimeZone,
        feedback: Option<String>,
    },
}

impl IndustrialConfirmation {
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// Write this decision into the backing columns.
    pub fn apply(&self, entry: &mut ActiveModel) {
        let (confirmed, by, at, feedback, rating) = match self {
            Self::Unset => (None, None, None, None, None),
            Self::Confirmed {
                by,
                at,
                feedback,
                rating,
            } => (
                Some(true),
                Some(by.clone()),
                Some(*at),
                feedback.clone(),
                Some(i32::from(*rating)),
            ),
            Self::NotConfirmed { by, at, feedback } => {
                (Some(false), Some(by.clone()), Some(*at), feedback.clone(), None)
            }
        };
        entry.industrial_confirmed = Set(confirmed);
        entry.industrial_confirmed_by = Set(by);
        entry.industrial_confirmed_at = Set(at);
        entry.industrial_feedback = Set(feedback);
        entry.industrial_rating = Set(rating);
    }
}

/// The academic supervisor's final acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AcademicReview {
    Unset,
    Reviewed {
        by: String,
        at: DateTimeWithTimeZone,
    },
}

impl AcademicReview {
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Write this mark into the backing columns.
    pub fn apply(&self, entry: &mut ActiveModel) {
        match self {
            Self::Unset => {
                entry.academic_reviewed_by = Set(None);
                entry.academic_reviewed_at = Set(None);
            }
            Self::Reviewed { by, at } => {
                entry.academic_reviewed_by = Set(Some(by.clone()));
                entry.academic_reviewed_at = Set(Some(*at));
            }
        }
    }
}

/// Where the student was when writing the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "log_entry")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub student_id: String,

    /// Display name cache; `student_id` is authoritative
    pub student_name: String,

    /// Day the activity took place
    pub activity_date: Date,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    #[sea_orm(nullable)]
    pub latitude: Option<f64>,

    #[sea_orm(nullable)]
    pub longitude: Option<f64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,

    pub status: LogStatus,

    /// Academic supervisor feedback, kept across resubmission
    #[sea_orm(column_type = "Text", nullable)]
    pub supervisor_feedback: Option<String>,

    #[sea_orm(nullable)]
    pub approved_by: Option<String>,

    #[sea_orm(nullable)]
    pub approved_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub industrial_confirmed: Option<bool>,

    #[sea_orm(nullable)]
    pub industrial_confirmed_by: Option<String>,

    #[sea_orm(nullable)]
    pub industrial_confirmed_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub industrial_feedback: Option<String>,

    /// 1..=5, present only when `industrial_confirmed` is true
    #[sea_orm(nullable)]
    pub industrial_rating: Option<i32>,

    #[sea_orm(nullable)]
    pub academic_reviewed_by: Option<String>,

    #[sea_orm(nullable)]
    pub academic_reviewed_at: Option<DateTimeWithTimeZone>,

    /// Bumped on every write; used for compare-and-swap updates
    pub version: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Decode the industrial confirmation columns.
    pub fn industrial_confirmation(&self) -> AppResult<IndustrialConfirmation> {
        let Some(confirmed) = self.industrial_confirmed else {
            return Ok(IndustrialConfirmation::Unset);
        };
        let (Some(by), Some(at)) = (
            self.industrial_confirmed_by.clone(),
            self.industrial_confirmed_at,
        ) else {
            return Err(AppError::Internal(format!(
                "log entry {} has an industrial decision without author or time",
                self.id
            )));
        };
        let feedback = self.industrial_feedback.clone();

        if confirmed {
            let rating = self.industrial_rating.ok_or_else(|| {
                AppError::Internal(format!(
                    "log entry {} is confirmed without a rating",
                    self.id
                ))
            })?;
            Ok(IndustrialConfirmation::Confirmed {
                by,
                at,
                feedback,
                rating: Rating::try_from(rating)?,
            })
        } else {
            Ok(IndustrialConfirmation::NotConfirmed { by, at, feedback })
        }
    }

    /// Decode the academic review columns.
    #[must_use]
    pub fn academic_review(&self) -> AcademicReview {
        match (&self.academic_reviewed_by, self.academic_reviewed_at) {
            (Some(by), Some(at)) => AcademicReview::Reviewed { by: by.clone(), at },
            _ => AcademicReview::Unset,
        }
    }

    /// Location attached to the entry, if any.
    #[must_use]
    pub fn location(&self) -> Option<EntryLocation> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(EntryLocation {
                latitude,
                longitude,
                address: self.address.clone(),
            }),
            _ => None,
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    fn entry() -> Model {
        let at = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
            .unwrap();
        Model {
            id: "entry1".to_string(),
            student_id: "student1".to_string(),
            student_name: "Ada".to_string(),
            activity_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            description: "Worked on API integration".to_string(),
            latitude: None,
            longitude: None,
            address: None,
            status: LogStatus::Approved,
            supervisor_feedback: None,
            approved_by: None,
            approved_at: None,
            industrial_confirmed: None,
            industrial_confirmed_by: None,
            industrial_confirmed_at: None,
            industrial_feedback: None,
            industrial_rating: None,
            academic_reviewed_by: None,
            academic_reviewed_at: None,
            version: 0,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_new_status_is_draft() {
        assert_eq!(LogStatus::default(), LogStatus::Draft);
        assert!(LogStatus::default().can_transition_to(LogStatus::Pending));
    }

    #[test]
    fn test_status_transitions() {
        use LogStatus::{Approved, Draft, Pending, Rejected};
        assert!(Draft.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Rejected.can_transition_to(Pending));

        assert!(!Draft.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Draft));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::try_from(0).is_err());
        assert!(Rating::try_from(6).is_err());
        assert_eq!(Rating::try_from(1).unwrap().get(), 1);
        assert_eq!(Rating::try_from(5).unwrap().get(), 5);
    }

    #[test]
    fn test_unset_tracks_decode() {
        let model = entry();
        assert_eq!(
            model.industrial_confirmation().unwrap(),
            IndustrialConfirmation::Unset
        );
        assert_eq!(model.academic_review(), AcademicReview::Unset);
    }

    #[test]
    fn test_confirmed_decodes_with_rating() {
        let mut model = entry();
        model.industrial_confirmed = Some(true);
        model.industrial_confirmed_by = Some("ind1".to_string());
        model.industrial_confirmed_at = Some(model.created_at);
        model.industrial_rating = Some(5);
        model.industrial_feedback = Some("Excellent".to_string());

        match model.industrial_confirmation().unwrap() {
            IndustrialConfirmation::Confirmed { by, rating, feedback, .. } => {
                assert_eq!(by, "ind1");
                assert_eq!(rating.get(), 5);
                assert_eq!(feedback.as_deref(), Some("Excellent"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_confirmed_without_rating_is_corrupt() {
        let mut model = entry();
        model.industrial_confirmed = Some(true);
        model.industrial_confirmed_by = Some("ind1".to_string());
        model.industrial_confirmed_at = Some(model.created_at);

        assert!(matches!(
            model.industrial_confirmation(),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_not_confirmed_drops_rating_column() {
        let model = entry();
        let mut active: ActiveModel = model.clone().into();
        IndustrialConfirmation::NotConfirmed {
            by: "ind1".to_string(),
            at: model.created_at,
            feedback: Some("Was not on site".to_string()),
        }
        .apply(&mut active);

        assert_eq!(active.industrial_confirmed, Set(Some(false)));
        assert_eq!(active.industrial_rating, Set(None));
    }
}
