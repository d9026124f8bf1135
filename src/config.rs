//! Server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration, loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// JWT secret for access tokens
    pub jwt_secret: String,
    /// Access token lifetime in minutes
    pub token_expiry_minutes: i64,
    /// Directory where uploaded product images are stored
    pub image_dir: String,
    /// Default admin account, upserted at startup
    pub admin_email: String,
    pub admin_name: String,
    pub admin_password: String,
    /// Environment: development | staging | production
    pub environment: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            token_expiry_minutes: std::env::var("TOKEN_EXPIRY_MINUTES")
                .ok()
                .and_then(|m| m.parse().ok())
                .unwrap_or(1440),
            image_dir: std::env::var("IMAGE_DIR").unwrap_or_else(|_| "assets/images".into()),
            // Normalized here so the seeded row matches what login looks up
            admin_email: crate::util::normalize_email(
                &std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".into()),
            ),
            admin_name: std::env::var("ADMIN_NAME").unwrap_or_else(|_| "admin".into()),
            admin_password: Self::require_secret("ADMIN_PASSWORD", &environment)?,
            environment,
        })
    }
}
