use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Product row joined with its (optional) image record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub created_at: i64,
    pub image_id: Option<i64>,
    pub thumbnail: Option<String>,
    pub mobile: Option<String>,
    pub tablet: Option<String>,
    pub desktop: Option<String>,
}

const SELECT_WITH_IMAGES: &str = "SELECT p.id, p.name, p.category, p.price, p.description, p.created_at, \
     pi.id AS image_id, pi.thumbnail, pi.mobile, pi.tablet, pi.desktop \
     FROM products p LEFT JOIN product_images pi ON pi.id = p.image_id WHERE TRUE";

/// Catalog listing filters.
///
/// Price filters are mutually exclusive by precedence: `max_price` wins over
/// `price` (exact match), which wins over `min_price`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub category: Option<String>,
    pub max_price: Option<Decimal>,
    pub price: Option<Decimal>,
    pub min_price: Option<Decimal>,
}

impl ProductFilter {
    fn apply(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(name) = &self.name {
            qb.push(" AND p.name = ").push_bind(name.clone());
        }
        if let Some(category) = &self.category {
            qb.push(" AND p.category = ").push_bind(category.clone());
        }
        if let Some(max) = self.max_price {
            qb.push(" AND p.price <= ").push_bind(max);
        } else if let Some(eq) = self.price {
            qb.push(" AND p.price = ").push_bind(eq);
        } else if let Some(min) = self.min_price {
            qb.push(" AND p.price >= ").push_bind(min);
        }
    }
}

pub async fn list(pool: &PgPool, filter: &ProductFilter) -> Result<Vec<ProductRow>, sqlx::Error> {
    let mut qb = QueryBuilder::new(SELECT_WITH_IMAGES);
    filter.apply(&mut qb);
    qb.push(" ORDER BY p.id DESC");
    qb.build_query_as::<ProductRow>().fetch_all(pool).await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<ProductRow>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_WITH_IMAGES} AND p.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Stored image filenames for the four responsive variants
#[derive(Debug, Default)]
pub struct ImageSet {
    pub thumbnail: Option<String>,
    pub mobile: Option<String>,
    pub tablet: Option<String>,
    pub desktop: Option<String>,
}

impl ImageSet {
    pub fn is_empty(&self) -> bool {
        self.thumbnail.is_none()
            && self.mobile.is_none()
            && self.tablet.is_none()
            && self.desktop.is_none()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        [
            self.thumbnail.as_deref(),
            self.mobile.as_deref(),
            self.tablet.as_deref(),
            self.desktop.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

pub struct NewProduct<'a> {
    pub name: &'a str,
    pub category: &'a str,
    pub price: Decimal,
    pub description: Option<&'a str>,
}

/// Insert a product and its image record in one transaction.
pub async fn create(
    pool: &PgPool,
    product: &NewProduct<'_>,
    images: &ImageSet,
    now: i64,
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let image_id: i64 = sqlx::query_scalar(
        "INSERT INTO product_images (thumbnail, mobile, tablet, desktop, created_at)
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(&images.thumbnail)
    .bind(&images.mobile)
    .bind(&images.tablet)
    .bind(&images.desktop)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let product_id: i64 = sqlx::query_scalar(
        "INSERT INTO products (name, category, price, description, image_id, created_at)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(product.name)
    .bind(product.category)
    .bind(product.price)
    .bind(product.description)
    .bind(image_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(product_id)
}

#[derive(Debug, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

/// Partially update a product and any provided image variants.
///
/// Returns the filenames displaced by new variants so the caller can remove
/// the stored files, or `None` when the product does not exist.
pub async fn update(
    pool: &PgPool,
    id: i64,
    patch: &ProductPatch,
    images: &ImageSet,
    now: i64,
) -> Result<Option<ImageSet>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let image_id: Option<Option<i64>> = sqlx::query_scalar(
        "UPDATE products SET
            name = COALESCE($2, name),
            category = COALESCE($3, category),
            price = COALESCE($4, price),
            description = COALESCE($5, description)
         WHERE id = $1 RETURNING image_id",
    )
    .bind(id)
    .bind(&patch.name)
    .bind(&patch.category)
    .bind(patch.price)
    .bind(&patch.description)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(image_id) = image_id else {
        return Ok(None);
    };

    let mut replaced = ImageSet::default();
    if !images.is_empty() {
        match image_id {
            Some(image_id) => {
                let old: (Option<String>, Option<String>, Option<String>, Option<String>) =
                    sqlx::query_as(
                        "SELECT thumbnail, mobile, tablet, desktop FROM product_images
                         WHERE id = $1 FOR UPDATE",
                    )
                    .bind(image_id)
                    .fetch_one(&mut *tx)
                    .await?;
                if images.thumbnail.is_some() {
                    replaced.thumbnail = old.0;
                }
                if images.mobile.is_some() {
                    replaced.mobile = old.1;
                }
                if images.tablet.is_some() {
                    replaced.tablet = old.2;
                }
                if images.desktop.is_some() {
                    replaced.desktop = old.3;
                }

                sqlx::query(
                    "UPDATE product_images SET
                        thumbnail = COALESCE($2, thumbnail),
                        mobile = COALESCE($3, mobile),
                        tablet = COALESCE($4, tablet),
                        desktop = COALESCE($5, desktop)
                     WHERE id = $1",
                )
                .bind(image_id)
                .bind(&images.thumbnail)
                .bind(&images.mobile)
                .bind(&images.tablet)
                .bind(&images.desktop)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                let new_image_id: i64 = sqlx::query_scalar(
                    "INSERT INTO product_images (thumbnail, mobile, tablet, desktop, created_at)
                     VALUES ($1, $2, $3, $4, $5) RETURNING id",
                )
                .bind(&images.thumbnail)
                .bind(&images.mobile)
                .bind(&images.tablet)
                .bind(&images.desktop)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query("UPDATE products SET image_id = $2 WHERE id = $1")
                    .bind(id)
                    .bind(new_image_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    tx.commit().await?;
    Ok(Some(replaced))
}

/// Delete a product and its image record.
///
/// Dependent cart items go away via `ON DELETE CASCADE`. Returns the stored
/// image filenames so the caller can remove the files, or `None` when the
/// product does not exist.
pub async fn delete(pool: &PgPool, id: i64) -> Result<Option<ImageSet>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let image_id: Option<Option<i64>> =
        sqlx::query_scalar("DELETE FROM products WHERE id = $1 RETURNING image_id")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

    let Some(image_id) = image_id else {
        return Ok(None);
    };

    let mut removed = ImageSet::default();
    if let Some(image_id) = image_id {
        let old: Option<(Option<String>, Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as(
                "DELETE FROM product_images WHERE id = $1
                 RETURNING thumbnail, mobile, tablet, desktop",
            )
            .bind(image_id)
            .fetch_optional(&mut *tx)
            .await?;
        if let Some((thumbnail, mobile, tablet, desktop)) = old {
            removed = ImageSet {
                thumbnail,
                mobile,
                tablet,
                desktop,
            };
        }
    }

    tx.commit().await?;
    Ok(Some(removed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(filter: &ProductFilter) -> String {
        let mut qb = QueryBuilder::new(SELECT_WITH_IMAGES);
        filter.apply(&mut qb);
        qb.sql().to_string()
    }

    #[test]
    fn test_no_filters() {
        let sql = sql_for(&ProductFilter::default());
        assert!(!sql.contains("p.name ="));
        assert!(!sql.contains("p.price"));
    }

    #[test]
    fn test_name_and_category_combine() {
        let sql = sql_for(&ProductFilter {
            name: Some("Laptop".into()),
            category: Some("Electronics".into()),
            ..Default::default()
        });
        assert!(sql.contains("p.name ="));
        assert!(sql.contains("p.category ="));
    }

    #[test]
    fn test_max_price_wins_over_others() {
        let sql = sql_for(&ProductFilter {
            max_price: Some(Decimal::new(100, 0)),
            price: Some(Decimal::new(50, 0)),
            min_price: Some(Decimal::new(10, 0)),
            ..Default::default()
        });
        assert!(sql.contains("p.price <="));
        assert!(!sql.contains("p.price ="));
        assert!(!sql.contains("p.price >="));
    }

    #[test]
    fn test_exact_price_wins_over_min() {
        let sql = sql_for(&ProductFilter {
            price: Some(Decimal::new(50, 0)),
            min_price: Some(Decimal::new(10, 0)),
            ..Default::default()
        });
        assert!(sql.contains("p.price ="));
        assert!(!sql.contains("p.price >="));
    }

    #[test]
    fn test_image_set_filenames() {
        let set = ImageSet {
            thumbnail: Some("a.png".into()),
            desktop: Some("d.png".into()),
            ..Default::default()
        };
        let names: Vec<&str> = set.filenames().collect();
        assert_eq!(names, ["a.png", "d.png"]);
        assert!(ImageSet::default().filenames().next().is_none());
    }

    #[test]
    fn test_min_price_alone() {
        let sql = sql_for(&ProductFilter {
            min_price: Some(Decimal::new(10, 0)),
            ..Default::default()
        });
        assert!(sql.contains("p.price >="));
    }
}
