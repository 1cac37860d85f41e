//! Lucidly API 的 HTTP 客戶端

pub mod api;
pub mod export;
pub mod jwt;

pub use api::LucidlyClient;
pub use jwt::is_token_expired;
