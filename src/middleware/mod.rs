pub mod auth;
pub mod response;

pub use auth::{firebase_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
