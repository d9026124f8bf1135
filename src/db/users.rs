use sqlx::PgPool;

/// User row joined with its role
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub hashed_password: String,
    pub created_at: i64,
    pub role_id: i64,
    pub role_name: String,
    pub role_created_at: i64,
}

const SELECT_WITH_ROLE: &str = "SELECT u.id, u.email, u.name, u.hashed_password, u.created_at, \
     r.id AS role_id, r.name AS role_name, r.created_at AS role_created_at \
     FROM users u JOIN roles r ON r.id = u.role_id";

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_WITH_ROLE} WHERE u.email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_WITH_ROLE} WHERE u.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_WITH_ROLE} ORDER BY u.id DESC"))
        .fetch_all(pool)
        .await
}

pub async fn create(
    pool: &PgPool,
    email: &str,
    name: &str,
    hashed_password: &str,
    role_id: i64,
    now: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO users (email, name, hashed_password, role_id, created_at)
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(email)
    .bind(name)
    .bind(hashed_password)
    .bind(role_id)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update_password(
    pool: &PgPool,
    user_id: i64,
    hashed_password: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET hashed_password = $1 WHERE id = $2")
        .bind(hashed_password)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
