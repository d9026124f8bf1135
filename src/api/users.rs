//! User endpoints: registration, profile, admin listing

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::auth::{AdminUser, AuthUser};
use crate::db;
use crate::db::roles::ROLE_USER;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::util;

use super::{ApiResult, internal};

#[derive(Serialize)]
pub struct RoleResponse {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: i64,
    pub role: RoleResponse,
}

impl From<db::users::User> for UserResponse {
    fn from(user: db::users::User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
            role: RoleResponse {
                id: user.role_id,
                name: user.role_name,
                created_at: user.role_created_at,
            },
        }
    }
}

/// POST /api/users
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub confirm_password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<UserResponse> {
    let email = util::normalize_email(&req.email);

    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("Invalid email"));
    }
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Name must not be empty"));
    }
    if req.password.len() < 8 {
        return Err(AppError::validation(
            "Password must be at least 8 characters",
        ));
    }
    if req.password != req.confirm_password {
        return Err(AppError::new(ErrorCode::PasswordsDoNotMatch));
    }

    if db::users::find_by_email(&state.pool, &email)
        .await
        .map_err(internal)?
        .is_some()
    {
        return Err(AppError::new(ErrorCode::EmailExists));
    }

    let role = db::roles::find_by_name(&state.pool, ROLE_USER)
        .await
        .map_err(internal)?
        .ok_or_else(|| internal("Default user role missing"))?;

    let hashed = util::hash_password(&req.password)
        .map_err(|e| internal(format!("Password hashing failed: {e}")))?;

    let user_id = match db::users::create(
        &state.pool,
        &email,
        req.name.trim(),
        &hashed,
        role.id,
        util::now_millis(),
    )
    .await
    {
        Ok(id) => id,
        // Concurrent registration of the same email loses the race here
        Err(e) if db::is_unique_violation(&e) => {
            return Err(AppError::new(ErrorCode::EmailExists));
        }
        Err(e) => return Err(internal(e)),
    };

    let user = db::users::find_by_id(&state.pool, user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| internal("Created user vanished"))?;

    tracing::info!(user_id, "New user registered");
    Ok(Json(user.into()))
}

/// GET /api/users/profile
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<UserResponse> {
    let user = db::users::find_by_id(&state.pool, user.id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    Ok(Json(user.into()))
}

/// GET /api/users (admin only)
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<UserResponse>> {
    let users = db::users::list(&state.pool).await.map_err(internal)?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}
