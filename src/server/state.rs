use std::sync::Arc;

use crate::adapters::{HuggingFaceClient, MemoryStore, StaticTokenAuth, SupabaseAuth, SupabaseStore};
use crate::config::{ServerSettings, StoreBackend};
use crate::core::DreamService;
use crate::domain::ports::{AuthProvider, DreamStore};
use crate::utils::error::Result;

/// 所有 handler 共用的狀態；Arc 讓 clone 很便宜
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DreamService>,
    pub auth: Arc<dyn AuthProvider>,
    pub environment: String,
    pub version: &'static str,
    /// 上傳音檔的大小上限（bytes）
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        service: DreamService,
        auth: Arc<dyn AuthProvider>,
        environment: impl Into<String>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            service: Arc::new(service),
            auth,
            environment: environment.into(),
            version: env!("CARGO_PKG_VERSION"),
            max_upload_bytes,
        }
    }
}

impl AppState {
    /// 依設定組裝儲存、認證與推論服務
    pub fn from_settings(settings: &ServerSettings) -> Result<Self> {
        let (store, auth): (Arc<dyn DreamStore>, Arc<dyn AuthProvider>) = match &settings.store {
            StoreBackend::Supabase(supabase) => (
                Arc::new(SupabaseStore::new(supabase.clone())),
                Arc::new(SupabaseAuth::new(supabase.clone())),
            ),
            StoreBackend::Memory { tokens } => {
                tracing::warn!("🧪 Using in-memory store with {} development token(s)", tokens.len());
                (
                    Arc::new(MemoryStore::new()),
                    Arc::new(StaticTokenAuth::new(tokens.clone())),
                )
            }
        };

        let analyzer = HuggingFaceClient::new(settings.inference.clone())?;
        if !analyzer.has_api_key() {
            tracing::warn!("⚠️ HF_API_KEY is not set; analysis and transcription will fail");
        }

        let service = DreamService::new(store, Arc::new(analyzer), settings.transcribe_timeout);
        Ok(Self::new(
            service,
            auth,
            settings.environment.clone(),
            settings.max_upload_bytes,
        ))
    }
}
