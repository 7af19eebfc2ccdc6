use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::admin::dto::{UpdateUserRequest, UserListResponse, UserResponse};
use crate::auth::extractors::RequireAdmin;
use crate::auth::repo::User;
use crate::error::ApiError;
use crate::state::AppState;

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = User::list(&state.db)
        .await
        .map_err(|e| ApiError::internal("Error fetching users", e))?;
    Ok(Json(UserListResponse {
        message: "Users fetched successfully".into(),
        data: users,
    }))
}

#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Error fetching user", e))?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(UserResponse {
        message: "User fetched successfully".into(),
        data: user,
    }))
}

#[instrument(skip(state, admin, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let existing = User::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Error updating user", e))?;
    if existing.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let updated = User::update_fields(
        &state.db,
        id,
        payload.name.as_deref(),
        payload.email.as_deref(),
        payload.role,
        payload.image.as_deref(),
    )
    .await
    .map_err(|e| ApiError::internal("Error updating user", e))?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(admin_id = %admin.id, user_id = %updated.id, "user updated by admin");
    Ok(Json(UserResponse {
        message: "User updated successfully".into(),
        data: updated,
    }))
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Error deleting user", e))?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    User::delete(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Error deleting user", e))?;

    info!(admin_id = %admin.id, user_id = %user.id, "user deleted by admin");
    Ok(Json(UserResponse {
        message: "User deleted successfully".into(),
        data: user,
    }))
}
