use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{Role, User};
use crate::error::ApiError;
use crate::state::AppState;

/// Authentication gate: validates the bearer token and resolves the encoded
/// subject against the users table. The resolved record rides along for
/// downstream handlers.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                ApiError::Unauthorized("Access denied. No token provided.".to_string())
            })?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or_else(|| {
                ApiError::Unauthorized("Access denied. No token provided.".to_string())
            })?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "bearer token rejected");
            ApiError::Unauthorized("Invalid token".to_string())
        })?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await
            .map_err(|e| ApiError::internal("Authentication failed", e))?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token subject no longer exists");
                ApiError::Unauthorized("Invalid token - user not found.".to_string())
            })?;

        Ok(CurrentUser(user))
    }
}

/// Authorization gate for admin-only routes; 403 for any other role.
pub struct RequireAdmin(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        restrict_to(&user, &[Role::Admin])?;
        Ok(RequireAdmin(user))
    }
}

fn restrict_to(user: &User, permitted: &[Role]) -> Result<(), ApiError> {
    if permitted.contains(&user.role) {
        Ok(())
    } else {
        warn!(user_id = %user.id, role = ?user.role, "role not permitted");
        Err(ApiError::Forbidden)
    }
}
