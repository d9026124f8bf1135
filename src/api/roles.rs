//! Role listing (admin only)

use axum::{Json, extract::State};

use crate::auth::AdminUser;
use crate::db;
use crate::db::roles::Role;
use crate::state::AppState;

use super::{ApiResult, internal};

/// GET /api/roles
pub async fn list_roles(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<Role>> {
    let roles = db::roles::list(&state.pool).await.map_err(internal)?;
    Ok(Json(roles))
}
