//! Bearer tokens for the mobile API.
//!
//! HS256-signed JWTs carrying the user id, role and email. The web app keeps
//! using the opaque session cookie; only `/mobile/*` routes accept these.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::models::UserRole;

const TOKEN_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub:   String,
    pub role:  UserRole,
    pub email: String,
    pub exp:   i64,
}

pub fn issue(secret: &str, user_id: &str, role: UserRole, email: &str) -> AppResult<String> {
    let claims = Claims {
        sub:   user_id.to_owned(),
        role,
        email: email.to_owned(),
        exp:   (Utc::now() + Duration::days(TOKEN_DAYS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {e}")))
}

pub fn verify(secret: &str, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify() {
        let token = issue("test-secret", "user-1", UserRole::User, "u@example.com").unwrap();
        let claims = verify("test-secret", &token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, UserRole::User);
        assert_eq!(claims.email, "u@example.com");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue("test-secret", "user-1", UserRole::Trainer, "t@example.com").unwrap();
        assert!(verify("other-secret", &token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify("test-secret", "not.a.jwt").is_err());
    }
}
