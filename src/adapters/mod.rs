// Adapters layer: concrete implementations of the domain ports for external systems.

pub mod huggingface;
pub mod memory;
pub mod supabase;

pub use huggingface::HuggingFaceClient;
pub use memory::{MemoryStore, StaticTokenAuth};
pub use supabase::{SupabaseAuth, SupabaseStore};
