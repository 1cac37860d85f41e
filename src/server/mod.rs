//! HTTP API：路由、認證與錯誤格式

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::create_router;
pub use state::AppState;
