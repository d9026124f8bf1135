//! API routes

pub mod auth;
pub mod cart;
pub mod health;
pub mod products;
pub mod roles;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::rate_limit::rate_limit_middleware;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Log an unexpected failure and hand the client an opaque 500.
pub(crate) fn internal(e: impl std::fmt::Display) -> AppError {
    tracing::error!("Internal error: {e}");
    AppError::new(ErrorCode::InternalError)
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Catalog endpoints accept multipart uploads with up to four image
    // variants, so they get a larger body limit than the JSON routes.
    let catalog = Router::new()
        .route(
            "/api/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/api/products/images/{filename}", get(products::get_image))
        .layer(DefaultBodyLimit::max(48 * 1024 * 1024));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/password-change", post(auth::change_password))
        .route("/api/users", get(users::list_users).post(users::register))
        .route("/api/users/profile", get(users::get_profile))
        .route("/api/roles", get(roles::list_roles))
        .merge(catalog)
        .route("/api/cart", get(cart::get_cart).post(cart::add_to_cart))
        .route(
            "/api/cart/{product_id}",
            put(cart::update_quantity).delete(cart::remove_from_cart),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
