use sqlx::PgPool;
use tracing::info;

use super::roles::{ROLE_ADMIN, ROLE_USER};

/// Seed the fixed roles and the default admin account.
///
/// Idempotent: roles are inserted only if missing, and the admin account is
/// upserted so a changed `ADMIN_PASSWORD` takes effect on restart.
pub async fn seed_defaults(
    pool: &PgPool,
    admin_email: &str,
    admin_name: &str,
    admin_password_hash: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    for role in [ROLE_USER, ROLE_ADMIN] {
        sqlx::query("INSERT INTO roles (name, created_at) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(role)
            .bind(now)
            .execute(pool)
            .await?;
    }

    let admin_role_id: i64 = sqlx::query_scalar("SELECT id FROM roles WHERE name = $1")
        .bind(ROLE_ADMIN)
        .fetch_one(pool)
        .await?;

    sqlx::query(
        "INSERT INTO users (email, name, hashed_password, role_id, created_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (email)
         DO UPDATE SET name = EXCLUDED.name,
                       hashed_password = EXCLUDED.hashed_password,
                       role_id = EXCLUDED.role_id",
    )
    .bind(admin_email)
    .bind(admin_name)
    .bind(admin_password_hash)
    .bind(admin_role_id)
    .bind(now)
    .execute(pool)
    .await?;

    info!(email = admin_email, "default admin account ready");
    Ok(())
}
