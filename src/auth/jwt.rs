use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::repo::Role;
use crate::state::AppState;

/// Signing and verification keys for bearer tokens, derived from the
/// configured shared secret and lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl_seconds: i64,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let jwt = &state.config.jwt;
        Self {
            encoding: EncodingKey::from_secret(jwt.secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt.secret.as_bytes()),
            ttl_seconds: jwt.ttl_minutes * 60,
        }
    }
}

impl JwtKeys {
    /// Issue a signed token embedding the subject id and role.
    pub fn sign(&self, user_id: Uuid, role: Role) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user_id,
            role,
            iat: now as usize,
            exp: (now + self.ttl_seconds) as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str, ttl_seconds: i64) -> JwtKeys {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    #[test]
    fn sign_and_verify_roundtrip_keeps_id_and_role() {
        let keys = keys("dev-secret", 300);
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, Role::Admin).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_expired_token() {
        // exp lands far enough in the past to clear the default leeway
        let keys = keys("dev-secret", -300);
        let token = keys.sign(Uuid::new_v4(), Role::User).expect("sign");
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbled_token() {
        let keys = keys("dev-secret", 300);
        assert!(keys.verify("not.a.token").is_err());
        assert!(keys.verify("").is_err());
    }

    #[test]
    fn verify_rejects_token_signed_with_other_secret() {
        let signer = keys("secret-a", 300);
        let verifier = keys("secret-b", 300);
        let token = signer.sign(Uuid::new_v4(), Role::User).expect("sign");
        assert!(verifier.verify(&token).is_err());
    }

    #[tokio::test]
    async fn keys_derive_from_state_config() {
        let state = crate::state::AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        assert_eq!(keys.ttl_seconds, 5 * 60);
    }
}
