//! Request guards
//!
//! [`AuthUser`] validates the bearer token and exposes the caller's identity;
//! [`AdminUser`] additionally requires the `admin` role. Handlers declare the
//! guard they need as an extractor argument.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::jwt::{self, Claims};
use crate::db::roles::ROLE_ADMIN;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller identity extracted from a valid JWT
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::invalid_token("Malformed subject claim"))?;
        Ok(Self {
            id,
            email: claims.email,
            role: claims.role,
        })
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Check if already extracted on this request
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(AppError::unauthorized)?;

        let token = jwt::extract_from_header(auth_header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?;

        let claims = jwt::decode_token(token, &state.jwt_secret)?;
        let user = AuthUser::try_from(claims)?;

        // Store in extensions for potential reuse
        parts.extensions.insert(user.clone());

        Ok(user)
    }
}

/// Guard for admin-only endpoints: a valid token whose role is `admin`
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = user.id, role = %user.role, "Admin endpoint denied");
            return Err(AppError::new(crate::error::ErrorCode::AdminRequired));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::rate_limit::RateLimiter;
    use crate::error::ErrorCode;
    use crate::services::image_store::ImageStore;

    const SECRET: &str = "test-secret-that-is-long-enough-00";

    fn test_state() -> AppState {
        let images = ImageStore::new(std::env::temp_dir().join("storefront-guard-tests"))
            .expect("image dir");
        AppState {
            pool: sqlx::PgPool::connect_lazy("postgres://localhost/unused").expect("lazy pool"),
            jwt_secret: SECRET.to_string(),
            token_expiry_minutes: 60,
            images,
            rate_limiter: RateLimiter::new(),
        }
    }

    fn parts_with_token(token: &str) -> Parts {
        let request = http::Request::builder()
            .uri("/api/roles")
            .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .expect("request");
        request.into_parts().0
    }

    fn claims(sub: &str, role: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            email: "x@example.com".to_string(),
            role: role.to_string(),
            exp: 2_000_000_000,
            iat: 1_000_000_000,
        }
    }

    #[test]
    fn test_claims_to_user() {
        let user = AuthUser::try_from(claims("7", "admin")).expect("convert");
        assert_eq!(user.id, 7);
        assert!(user.is_admin());
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let err = AuthUser::try_from(claims("not-a-number", "user")).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_plain_user_is_not_admin() {
        let user = AuthUser::try_from(claims("1", "user")).expect("convert");
        assert!(!user.is_admin());
    }

    #[tokio::test]
    async fn test_admin_guard_rejects_user_role() {
        let state = test_state();
        let token = jwt::create_token(5, "user@example.com", "user", SECRET, 60).expect("token");
        let mut parts = parts_with_token(&token);

        let err = AdminUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AdminRequired);
    }

    #[tokio::test]
    async fn test_admin_guard_accepts_admin_role() {
        let state = test_state();
        let token =
            jwt::create_token(9, "admin@example.com", "admin", SECRET, 60).expect("token");
        let mut parts = parts_with_token(&token);

        let admin = AdminUser::from_request_parts(&mut parts, &state)
            .await
            .expect("admin guard");
        assert_eq!(admin.0.id, 9);
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthenticated() {
        let state = test_state();
        let request = http::Request::builder().body(()).expect("request");
        let mut parts = request.into_parts().0;

        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
    }
}
