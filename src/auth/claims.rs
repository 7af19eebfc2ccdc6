use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::Role;

/// JWT payload: the authenticated subject and its role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // user ID
    pub role: Role, // role at issue time
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
}
