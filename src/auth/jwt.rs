//! JWT token service
//!
//! Issues and validates the signed access tokens carrying user identity and
//! role claims.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// JWT claims for user authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// User email
    pub email: String,
    /// Role name ("user" or "admin")
    pub role: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Create a signed access token for a user
pub fn create_token(
    user_id: i64,
    email: &str,
    role: &str,
    secret: &str,
    expiry_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: (now + chrono::Duration::minutes(expiry_minutes)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate signature and expiry, returning the claims.
///
/// Expired tokens are distinguished from otherwise invalid ones; both map
/// to 401 at the API boundary.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let validation = Validation::default();
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid or malformed token"),
        }
    })?;

    Ok(token_data.claims)
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_from_header(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    const SECRET: &str = "test-secret-that-is-long-enough-00";

    #[test]
    fn test_token_roundtrip() {
        let token = create_token(42, "jane@example.com", "user", SECRET, 60)
            .expect("Failed to generate test token");

        let claims = decode_token(&token, SECRET).expect("Failed to validate test token");
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "jane@example.com");
        assert_eq!(claims.role, "user");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_token_rejected() {
        // Issued with a negative lifetime, already expired
        let token = create_token(1, "a@b.c", "user", SECRET, -5).expect("token");
        let err = decode_token(&token, SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(1, "a@b.c", "admin", SECRET, 60).expect("token");
        let err = decode_token(&token, "another-secret-entirely-000000000").unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_malformed_token_rejected() {
        let err = decode_token("definitely.not.a-jwt", SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(extract_from_header("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_from_header("Basic abc"), None);
    }
}
