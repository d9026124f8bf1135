//! Authentication endpoints: login, password change

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthUser, jwt};
use crate::db;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::util;

use super::{ApiResult, internal};
use super::users::UserResponse;

/// POST /api/auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let email = util::normalize_email(&req.email);

    // Unknown email and wrong password are indistinguishable to the caller
    let user = db::users::find_by_email(&state.pool, &email)
        .await
        .map_err(internal)?
        .ok_or_else(AppError::invalid_credentials)?;

    if !util::verify_password(&req.password, &user.hashed_password) {
        return Err(AppError::invalid_credentials());
    }

    let token = jwt::create_token(
        user.id,
        &user.email,
        &user.role_name,
        &state.jwt_secret,
        state.token_expiry_minutes,
    )
    .map_err(|e| internal(format!("JWT creation failed: {e}")))?;

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// POST /api/auth/password-change
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<serde_json::Value> {
    if req.new_password.len() < 8 {
        return Err(AppError::validation(
            "Password must be at least 8 characters",
        ));
    }

    let user = db::users::find_by_id(&state.pool, caller.id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    if !util::verify_password(&req.old_password, &user.hashed_password) {
        return Err(AppError::invalid_credentials());
    }
    if req.new_password == req.old_password {
        return Err(AppError::new(ErrorCode::PasswordUnchanged));
    }

    let hashed = util::hash_password(&req.new_password)
        .map_err(|e| internal(format!("Password hashing failed: {e}")))?;
    db::users::update_password(&state.pool, user.id, &hashed)
        .await
        .map_err(internal)?;

    tracing::info!(user_id = user.id, "Password changed");
    Ok(Json(serde_json::json!({ "message": "Password updated" })))
}
