use rust_decimal::Decimal;
use sqlx::PgPool;

/// Cart item joined with its product and image record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItemRow {
    pub id: i64,
    pub quantity: i32,
    pub created_at: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_category: String,
    pub product_price: Decimal,
    pub product_description: Option<String>,
    pub product_created_at: i64,
    pub image_id: Option<i64>,
    pub thumbnail: Option<String>,
    pub mobile: Option<String>,
    pub tablet: Option<String>,
    pub desktop: Option<String>,
}

const SELECT_WITH_PRODUCT: &str = "SELECT c.id, c.quantity, c.created_at, \
     p.id AS product_id, p.name AS product_name, p.category AS product_category, \
     p.price AS product_price, p.description AS product_description, \
     p.created_at AS product_created_at, \
     pi.id AS image_id, pi.thumbnail, pi.mobile, pi.tablet, pi.desktop \
     FROM cart_items c \
     JOIN products p ON p.id = c.product_id \
     LEFT JOIN product_images pi ON pi.id = p.image_id";

pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<CartItemRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "{SELECT_WITH_PRODUCT} WHERE c.user_id = $1 ORDER BY c.id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_row(
    pool: &PgPool,
    user_id: i64,
    product_id: i64,
) -> Result<Option<CartItemRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "{SELECT_WITH_PRODUCT} WHERE c.user_id = $1 AND c.product_id = $2"
    ))
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await
}

/// Add a product to the cart. A second add of the same product increments
/// the existing line's quantity instead of creating a duplicate.
pub async fn add(
    pool: &PgPool,
    user_id: i64,
    product_id: i64,
    quantity: i32,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cart_items (user_id, product_id, quantity, created_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id, product_id)
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Replace the quantity of an existing cart line.
///
/// Returns `false` when the product is not in the user's cart.
pub async fn set_quantity(
    pool: &PgPool,
    user_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove a product from the cart. Returns `false` when it was not there.
pub async fn remove(pool: &PgPool, user_id: i64, product_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
