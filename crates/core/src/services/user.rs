//! User service.
//!
//! Identity verification lives outside this system; the service only keeps
//! the profile data the workflow and attendance rules depend on.

use chrono::Utc;
use chrono_tz::Tz;
use logbook_common::{AppError, AppResult, IdGenerator};
use logbook_db::{
    entities::user::{self, UserRole},
    repositories::UserRepository,
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Input for creating a new user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[validate(email, length(max = 256))]
    pub email: String,

    #[validate(length(min = 1, max = 256))]
    pub name: String,

    pub role: UserRole,

    #[validate(length(max = 256))]
    pub institution: Option<String>,

    #[validate(length(max = 256))]
    pub department: Option<String>,

    #[validate(length(max = 64))]
    pub matric_number: Option<String>,

    #[validate(length(max = 1024))]
    pub placement_address: Option<String>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub placement_latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub placement_longitude: Option<f64>,

    #[validate(length(max = 64))]
    pub timezone: Option<String>,
}

/// Input for updating a student's placement details.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlacementInput {
    #[validate(length(max = 1024))]
    pub placement_address: Option<Option<String>>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub placement_latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub placement_longitude: Option<f64>,

    pub timezone: Option<Option<String>>,
}

/// Timezone used for a user's calendar days.
#[must_use]
pub fn timezone_of(user: &user::Model, fallback: Tz) -> Tz {
    user.timezone
        .as_deref()
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(fallback)
}

fn validate_timezone(name: Option<&str>) -> AppResult<()> {
    if let Some(name) = name {
        name.parse::<Tz>()
            .map_err(|_| AppError::Validation(format!("unknown timezone: {name}")))?;
    }
    Ok(())
}

/// Latitude and longitude are only meaningful together.
fn validate_coordinate_pair(lat: Option<f64>, lon: Option<f64>) -> AppResult<()> {
    if lat.is_some() != lon.is_some() {
        return Err(AppError::Validation(
            "placementLatitude and placementLongitude must be set together".to_string(),
        ));
    }
    Ok(())
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a user.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;
        validate_coordinate_pair(input.placement_latitude, input.placement_longitude)?;
        validate_timezone(input.timezone.as_deref())?;

        let email = input.email.trim().to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            name: Set(input.name.trim().to_string()),
            role: Set(input.role),
            institution: Set(input.institution),
            department: Set(input.department),
            matric_number: Set(input.matric_number),
            placement_address: Set(input.placement_address),
            placement_latitude: Set(input.placement_latitude),
            placement_longitude: Set(input.placement_longitude),
            timezone: Set(input.timezone),
            assigned_supervisor_id: Set(None),
            assigned_industrial_supervisor_id: Set(None),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.user_repo.create(model).await?;
        tracing::info!(user_id = %created.id, role = ?created.role, "User created");
        Ok(created)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Get an active user by ID. Deactivated accounts count as unknown.
    pub async fn get_active(&self, id: &str) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(id).await?;
        if !user.is_active {
            return Err(AppError::NotFound(format!("user {id}")));
        }
        Ok(user)
    }

    /// List users with a role.
    pub async fn list_by_role(
        &self,
        role: UserRole,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        self.user_repo.find_by_role(role, limit.min(100), offset).await
    }

    /// Update placement address, coordinates or timezone of a student.
    pub async fn update_placement(
        &self,
        student_id: &str,
        input: UpdatePlacementInput,
    ) -> AppResult<user::Model> {
        input.validate()?;
        validate_coordinate_pair(input.placement_latitude, input.placement_longitude)?;
        validate_timezone(input.timezone.as_ref().and_then(Option::as_deref))?;

        let student = self.user_repo.get_by_id(student_id).await?;
        if student.role != UserRole::Student {
            return Err(AppError::Validation(format!(
                "user {student_id} is not a student"
            )));
        }

        let mut active: user::ActiveModel = student.into();
        if let Some(address) = input.placement_address {
            active.placement_address = Set(address);
        }
        if let (Some(lat), Some(lon)) = (input.placement_latitude, input.placement_longitude) {
            active.placement_latitude = Set(Some(lat));
            active.placement_longitude = Set(Some(lon));
        }
        if let Some(timezone) = input.timezone {
            active.timezone = Set(timezone);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await
    }
}
