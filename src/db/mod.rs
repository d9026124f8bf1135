//! Database access layer
//!
//! Module per table; plain sqlx query functions returning `sqlx::Error`.
//! Mapping to API errors happens at the handler layer.

pub mod bootstrap;
pub mod cart;
pub mod products;
pub mod roles;
pub mod users;

/// True when a write failed on a Postgres unique constraint (SQLSTATE 23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.code().as_deref() == Some("23505"))
}
