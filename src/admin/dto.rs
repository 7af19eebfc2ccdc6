use serde::{Deserialize, Serialize};

use crate::auth::repo::{Role, User};

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub message: String,
    pub data: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: String,
    pub data: User,
}

/// Admin update body; `image` applies to the profile image URL.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub image: Option<String>,
}
