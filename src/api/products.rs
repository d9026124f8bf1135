//! Product catalog endpoints
//!
//! Browsing requires authentication; create/update/delete require the
//! `admin` role. Create and update take `multipart/form-data` so the image
//! variants can ride along with the product fields.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::auth::{AdminUser, AuthUser};
use crate::db;
use crate::db::products::{ImageSet, NewProduct, ProductFilter, ProductPatch, ProductRow};
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::util;

use super::{ApiResult, internal};

#[derive(Debug, Serialize)]
pub struct ProductImages {
    pub thumbnail: Option<String>,
    pub mobile: Option<String>,
    pub tablet: Option<String>,
    pub desktop: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub created_at: i64,
    pub images: Option<ProductImages>,
}

fn image_url(filename: String) -> String {
    format!("/api/products/images/{filename}")
}

impl From<ProductRow> for ProductResponse {
    fn from(row: ProductRow) -> Self {
        let images = row.image_id.map(|_| ProductImages {
            thumbnail: row.thumbnail.map(image_url),
            mobile: row.mobile.map(image_url),
            tablet: row.tablet.map(image_url),
            desktop: row.desktop.map(image_url),
        });
        Self {
            id: row.id,
            name: row.name,
            category: row.category,
            price: row.price,
            description: row.description,
            created_at: row.created_at,
            images,
        }
    }
}

/// Product fields collected from a multipart form
#[derive(Default)]
struct ProductForm {
    name: Option<String>,
    category: Option<String>,
    price: Option<Decimal>,
    description: Option<String>,
    images: ImageSet,
}

async fn parse_form(state: &AppState, mut multipart: Multipart) -> Result<ProductForm, AppError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::invalid_request(format!("Multipart error: {e}")))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "name" => form.name = Some(read_text(field).await?),
            "category" => form.category = Some(read_text(field).await?),
            "description" => form.description = Some(read_text(field).await?),
            "price" => {
                let raw = read_text(field).await?;
                let price: Decimal = raw
                    .trim()
                    .parse()
                    .map_err(|_| AppError::validation("Invalid price"))?;
                if price < Decimal::ZERO {
                    return Err(AppError::validation("Price must not be negative"));
                }
                form.price = Some(price);
            }
            "thumbnail" | "mobile" | "tablet" | "desktop" => {
                let original = field.file_name().map(str::to_owned).unwrap_or_default();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::invalid_request(format!("Read error: {e}")))?;

                // Browsers submit empty parts for untouched file inputs
                if original.is_empty() && data.is_empty() {
                    continue;
                }

                let stored = state.images.save(&original, data).await?;
                match name.as_str() {
                    "thumbnail" => form.images.thumbnail = Some(stored),
                    "mobile" => form.images.mobile = Some(stored),
                    "tablet" => form.images.tablet = Some(stored),
                    _ => form.images.desktop = Some(stored),
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::invalid_request(format!("Read error: {e}")))
}

/// GET /api/products
pub async fn list_products(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Vec<ProductResponse>> {
    let rows = db::products::list(&state.pool, &filter)
        .await
        .map_err(internal)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// GET /api/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<ProductResponse> {
    let row = db::products::find_by_id(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    Ok(Json(row.into()))
}

/// POST /api/products (admin only)
pub async fn create_product(
    State(state): State<AppState>,
    admin: AdminUser,
    multipart: Multipart,
) -> ApiResult<ProductResponse> {
    let form = parse_form(&state, multipart).await?;

    let name = form
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::validation("Name is required"))?;
    let category = form
        .category
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::validation("Category is required"))?;
    let price = form
        .price
        .ok_or_else(|| AppError::validation("Price is required"))?;

    let product = NewProduct {
        name: name.trim(),
        category: category.trim(),
        price,
        description: form.description.as_deref(),
    };
    let id = db::products::create(&state.pool, &product, &form.images, util::now_millis())
        .await
        .map_err(internal)?;

    let row = db::products::find_by_id(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| internal("Created product vanished"))?;

    tracing::info!(product_id = id, admin_id = admin.0.id, "Product created");
    Ok(Json(row.into()))
}

/// PUT /api/products/{id} (admin only)
pub async fn update_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<ProductResponse> {
    let form = parse_form(&state, multipart).await?;

    let patch = ProductPatch {
        name: form.name.map(|n| n.trim().to_owned()),
        category: form.category.map(|c| c.trim().to_owned()),
        price: form.price,
        description: form.description,
    };

    let replaced =
        db::products::update(&state.pool, id, &patch, &form.images, util::now_millis())
            .await
            .map_err(internal)?
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    // Displaced variants are gone from the DB; drop their files too
    for filename in replaced.filenames() {
        state.images.remove(filename).await;
    }

    let row = db::products::find_by_id(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    tracing::info!(product_id = id, admin_id = admin.0.id, "Product updated");
    Ok(Json(row.into()))
}

/// DELETE /api/products/{id} (admin only)
pub async fn delete_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let removed = db::products::delete(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    for filename in removed.filenames() {
        state.images.remove(filename).await;
    }

    tracing::info!(product_id = id, admin_id = admin.0.id, "Product deleted");
    Ok(Json(serde_json::json!({ "message": "Product deleted" })))
}

/// GET /api/products/images/{filename}
pub async fn get_image(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (data, content_type) = state.images.open(&filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}
