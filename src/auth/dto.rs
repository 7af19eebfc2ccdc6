use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::{Role, User};

/// Request body for user registration. Fields are optional so missing ones
/// can be answered with the 400 shape instead of a deserializer rejection.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Identity fields safe to hand to clients.
#[derive(Debug, Serialize)]
pub struct PublicIdentity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for PublicIdentity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Response for register and login: a token plus the flat identity fields.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthResponse {
    pub fn new(message: &str, token: String, user: &User) -> Self {
        Self {
            message: message.to_string(),
            token,
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: PublicIdentity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            name: "Grace".into(),
            email: "grace@example.com".into(),
            password_hash: "hash".into(),
            role: Role::User,
            profile_image: "https://via.placeholder.com/150".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn auth_response_is_flat_and_has_no_secret() {
        let user = sample_user();
        let resp = AuthResponse::new("Login successful", "tok123".into(), &user);
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["message"], "Login successful");
        assert_eq!(json["token"], "tok123");
        assert_eq!(json["email"], "grace@example.com");
        assert_eq!(json["role"], "user");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("user").is_none());
    }

    #[test]
    fn register_request_tolerates_missing_fields() {
        let req: RegisterRequest = serde_json::from_str(r#"{"email":"a@b.co"}"#).expect("de");
        assert_eq!(req.email.as_deref(), Some("a@b.co"));
        assert!(req.name.is_none());
        assert!(req.password.is_none());
        assert!(req.role.is_none());
    }
}
