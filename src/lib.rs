pub mod adapters;
pub mod client;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

pub use client::LucidlyClient;
pub use config::{InferenceSettings, ServerSettings, StoreBackend, SupabaseSettings};
pub use core::{Caller, DreamService};
pub use domain::model::{ApiResponse, Dream, DreamView, Mood, NewDream, Sentiment};
pub use utils::error::{LucidlyError, Result};
