//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use logbook_common::AppError;
use logbook_db::entities::user;

/// The acting user, resolved by [`crate::middleware::actor_middleware`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthenticated)
    }
}
