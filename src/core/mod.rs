pub mod cascade;
pub mod service;

pub use crate::domain::ports::{AuthProvider, DreamAnalyzer, DreamStore};
pub use crate::utils::error::Result;
pub use service::{Caller, DreamService};
