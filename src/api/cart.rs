//! Shopping cart endpoints
//!
//! Every operation is scoped to the authenticated caller; there is no way to
//! address another user's cart.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db;
use crate::db::cart::CartItemRow;
use crate::db::products::ProductRow;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::util;

use super::products::ProductResponse;
use super::{ApiResult, internal};

#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub id: i64,
    pub quantity: i32,
    pub created_at: i64,
    pub product: ProductResponse,
}

impl From<CartItemRow> for CartItemResponse {
    fn from(row: CartItemRow) -> Self {
        let product = ProductRow {
            id: row.product_id,
            name: row.product_name,
            category: row.product_category,
            price: row.product_price,
            description: row.product_description,
            created_at: row.product_created_at,
            image_id: row.image_id,
            thumbnail: row.thumbnail,
            mobile: row.mobile,
            tablet: row.tablet,
            desktop: row.desktop,
        };
        Self {
            id: row.id,
            quantity: row.quantity,
            created_at: row.created_at,
            product: product.into(),
        }
    }
}

/// GET /api/cart
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<CartItemResponse>> {
    let rows = db::cart::list_by_user(&state.pool, user.id)
        .await
        .map_err(internal)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// POST /api/cart
#[derive(Deserialize)]
pub struct AddToCartRequest {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<AddToCartRequest>,
) -> ApiResult<CartItemResponse> {
    if req.quantity <= 0 {
        return Err(AppError::new(ErrorCode::CartQuantityInvalid));
    }

    if db::products::find_by_id(&state.pool, req.product_id)
        .await
        .map_err(internal)?
        .is_none()
    {
        return Err(AppError::new(ErrorCode::ProductNotFound));
    }

    db::cart::add(
        &state.pool,
        user.id,
        req.product_id,
        req.quantity,
        util::now_millis(),
    )
    .await
    .map_err(internal)?;

    let row = db::cart::get_row(&state.pool, user.id, req.product_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| internal("Cart item vanished after insert"))?;

    Ok(Json(row.into()))
}

/// PUT /api/cart/{product_id}
#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

pub async fn update_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<i64>,
    Json(req): Json<UpdateQuantityRequest>,
) -> ApiResult<CartItemResponse> {
    if req.quantity <= 0 {
        return Err(AppError::new(ErrorCode::CartQuantityInvalid));
    }

    let updated = db::cart::set_quantity(&state.pool, user.id, product_id, req.quantity)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(AppError::new(ErrorCode::CartItemNotFound));
    }

    let row = db::cart::get_row(&state.pool, user.id, product_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CartItemNotFound))?;

    Ok(Json(row.into()))
}

/// DELETE /api/cart/{product_id}
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let removed = db::cart::remove(&state.pool, user.id, product_id)
        .await
        .map_err(internal)?;
    if !removed {
        return Err(AppError::new(ErrorCode::CartItemNotFound));
    }

    Ok(Json(serde_json::json!({ "message": "Item removed" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::rate_limit::RateLimiter;
    use crate::services::image_store::ImageStore;

    // Quantity validation runs before any query, so a lazily-connected pool
    // that never reaches a database is enough here.
    fn test_state() -> AppState {
        let images = ImageStore::new(std::env::temp_dir().join("storefront-cart-tests"))
            .expect("image dir");
        AppState {
            pool: sqlx::PgPool::connect_lazy("postgres://localhost/unused").expect("lazy pool"),
            jwt_secret: "test-secret-that-is-long-enough-00".to_string(),
            token_expiry_minutes: 60,
            images,
            rate_limiter: RateLimiter::new(),
        }
    }

    fn caller() -> AuthUser {
        AuthUser {
            id: 1,
            email: "user@example.com".to_string(),
            role: "user".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_rejects_nonpositive_quantity() {
        for quantity in [0, -3] {
            let req = AddToCartRequest {
                product_id: 1,
                quantity,
            };
            let err = add_to_cart(State(test_state()), caller(), Json(req))
                .await
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::CartQuantityInvalid);
        }
    }

    #[tokio::test]
    async fn test_update_rejects_nonpositive_quantity() {
        for quantity in [0, -1] {
            let req = UpdateQuantityRequest { quantity };
            let err = update_quantity(State(test_state()), caller(), Path(1), Json(req))
                .await
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::CartQuantityInvalid);
        }
    }

    #[test]
    fn test_add_quantity_defaults_to_one() {
        let req: AddToCartRequest =
            serde_json::from_str(r#"{"product_id": 7}"#).expect("parse");
        assert_eq!(req.quantity, 1);
    }
}
