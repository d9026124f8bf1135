//! Authentication and authorization: JWT tokens, request guards, rate limiting

pub mod extractor;
pub mod jwt;
pub mod rate_limit;

pub use extractor::{AdminUser, AuthUser};
