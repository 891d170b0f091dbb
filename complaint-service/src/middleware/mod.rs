pub mod admin;
pub mod origin;

pub use admin::{admin_auth_middleware, ADMIN_API_KEY_HEADER};
pub use origin::origin_guard_middleware;
