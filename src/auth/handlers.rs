use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::auth::{
    dto::{
        AuthResponse, LoginRequest, ProfileResponse, PublicIdentity, RegisterRequest,
        UpdateProfileRequest,
    },
    extractors::CurrentUser,
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::{Role, User},
};
use crate::error::ApiError;
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (Some(name), Some(email), Some(password)) = (
        text(&payload.name),
        text(&payload.email),
        payload.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Please provide all required fields: name, email, password".into(),
        ));
    };

    if !is_valid_email(email) {
        warn!(email, "invalid email on register");
        return Err(ApiError::BadRequest("Please provide a valid email".into()));
    }
    if password.len() < 6 {
        return Err(ApiError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }

    let existing = User::find_by_email(&state.db, email)
        .await
        .map_err(|e| ApiError::internal("Error registering user", e))?;
    if existing.is_some() {
        warn!(email, "email already registered");
        return Err(ApiError::BadRequest("User already exists".into()));
    }

    let hash =
        hash_password(password).map_err(|e| ApiError::internal("Error registering user", e))?;
    let role = payload.role.unwrap_or(Role::User);

    let user = User::create(&state.db, name, email, &hash, role)
        .await
        .map_err(|e| ApiError::internal("Error registering user", e))?;

    let token = JwtKeys::from_ref(&state)
        .sign(user.id, user.role)
        .map_err(|e| ApiError::internal("Error registering user", e))?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new(
            "User registered successfully",
            token,
            &user,
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = text(&payload.email).unwrap_or_default();
    let password = payload.password.as_deref().unwrap_or_default();

    let user = User::find_by_email(&state.db, email)
        .await
        .map_err(|e| ApiError::internal("Error logging in user", e))?
        .ok_or_else(|| {
            warn!(email, "login for unknown email");
            ApiError::NotFound("User not found".into())
        })?;

    let ok = verify_password(password, &user.password_hash)
        .map_err(|e| ApiError::internal("Error logging in user", e))?;
    if !ok {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::BadRequest("Invalid password".into()));
    }

    let token = JwtKeys::from_ref(&state)
        .sign(user.id, user.role)
        .map_err(|e| ApiError::internal("Error logging in user", e))?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse::new("Login successful", token, &user)))
}

#[instrument(skip_all)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<PublicIdentity> {
    Json(PublicIdentity::from(&user))
}

#[instrument(skip(state, user, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (Some(name), Some(email)) = (text(&payload.name), text(&payload.email)) else {
        return Err(ApiError::BadRequest(
            "Please provide both name and email".into(),
        ));
    };

    let taken = User::find_by_email(&state.db, email)
        .await
        .map_err(|e| ApiError::internal("Error updating profile", e))?;
    if taken.map_or(false, |other| other.id != user.id) {
        return Err(ApiError::BadRequest(
            "Email already in use by another account".into(),
        ));
    }

    let updated = User::update_profile(&state.db, user.id, name, email)
        .await
        .map_err(|e| ApiError::internal("Error updating profile", e))?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(ProfileResponse {
        message: "Profile updated successfully".into(),
        user: PublicIdentity::from(&updated),
    }))
}
