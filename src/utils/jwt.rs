use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AppError, Result},
    models::UserRole,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
}

pub fn generate_token(auth: &AuthConfig, user_id: Uuid, role: UserRole) -> Result<String> {
    let now = chrono::Utc::now();
    let expiration = now
        .checked_add_signed(chrono::Duration::hours(auth.token_ttl_hours))
        .ok_or_else(|| AppError::InternalError("Failed to calculate expiration".to_string()))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(format!("Token generation failed: {}", e)))
}

/// Verification failures are distinguished in the logs only; the caller
/// always gets the same generic 401.
pub fn verify_token(auth: &AuthConfig, token: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => tracing::debug!("Rejected expired token"),
            ErrorKind::InvalidSignature => tracing::warn!("Rejected token with bad signature"),
            _ => tracing::warn!("Rejected malformed token: {}", e),
        }
        AppError::Unauthorized("Недействительный токен".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
        }
    }

    #[test]
    fn round_trips_claims() {
        let auth = test_config();
        let user_id = Uuid::new_v4();

        let token = generate_token(&auth, user_id, UserRole::Admin).unwrap();
        let claims = verify_token(&auth, &token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, UserRole::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let auth = test_config();
        let other = AuthConfig {
            jwt_secret: "other-secret".to_string(),
            token_ttl_hours: 1,
        };

        let token = generate_token(&other, Uuid::new_v4(), UserRole::User).unwrap();
        assert!(verify_token(&auth, &token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        // TTL far enough in the past to clear the default validation leeway
        let auth = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: -2,
        };

        let token = generate_token(&auth, Uuid::new_v4(), UserRole::User).unwrap();
        assert!(verify_token(&auth, &token).is_err());
    }

    #[test]
    fn rejects_garbage() {
        let auth = test_config();
        assert!(verify_token(&auth, "not-a-token").is_err());
    }
}
