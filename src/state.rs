//! Application state

use sqlx::PgPool;

use crate::auth::rate_limit::RateLimiter;
use crate::config::Config;
use crate::services::image_store::ImageStore;
use crate::{db, util};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// JWT secret for access tokens
    pub jwt_secret: String,
    /// Access token lifetime in minutes
    pub token_expiry_minutes: i64,
    /// Product image storage
    pub images: ImageStore,
    /// Uniform per-client rate limiter
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Connect to the database, run migrations, seed default data.
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let admin_password_hash = util::hash_password(&config.admin_password)
            .map_err(|e| format!("Failed to hash default admin password: {e}"))?;
        db::bootstrap::seed_defaults(
            &pool,
            &config.admin_email,
            &config.admin_name,
            &admin_password_hash,
            util::now_millis(),
        )
        .await?;

        let images = ImageStore::new(&config.image_dir)?;

        Ok(Self {
            pool,
            jwt_secret: config.jwt_secret.clone(),
            token_expiry_minutes: config.token_expiry_minutes,
            images,
            rate_limiter: RateLimiter::new(),
        })
    }
}
