#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::utils::error::{LucidlyError, Result};
use crate::utils::validation::{
    validate_model_names, validate_non_empty_string, validate_positive_number, validate_range,
    validate_url, Validate,
};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_TRANSCRIBE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_PORT: u16 = 8080;

fn models(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// 推論服務設定：API key、逾時與各任務依序嘗試的模型清單
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub summary_models: Vec<String>,
    pub strict_summary_models: Vec<String>,
    pub sentiment_models: Vec<String>,
    pub interpretation_models: Vec<String>,
    pub transcription_models: Vec<String>,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INFERENCE_BASE_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            summary_models: models(&[
                "facebook/bart-large-cnn",
                "sshleifer/distilbart-cnn-12-6",
                "microsoft/DialoGPT-medium",
            ]),
            strict_summary_models: models(&[
                "facebook/bart-large-cnn",
                "sshleifer/distilbart-cnn-12-6",
            ]),
            sentiment_models: models(&[
                "cardiffnlp/twitter-roberta-base-sentiment-latest",
                "nlptown/bert-base-multilingual-uncased-sentiment",
                "distilbert-base-uncased-finetuned-sst-2-english",
            ]),
            interpretation_models: models(&[
                "microsoft/DialoGPT-medium",
                "google/flan-t5-base",
                "gpt2",
            ]),
            // 最快的模型放第一個
            transcription_models: models(&[
                "openai/whisper-large-v3-turbo",
                "distil-whisper/distil-large-v3.5",
                "openai/whisper-large-v3",
            ]),
        }
    }
}

impl Validate for InferenceSettings {
    fn validate(&self) -> Result<()> {
        validate_url("inference.base_url", &self.base_url)?;
        if let Some(key) = &self.api_key {
            validate_non_empty_string("inference.api_key", key)?;
        }
        validate_model_names("inference.summary_models", &self.summary_models)?;
        validate_model_names("inference.strict_summary_models", &self.strict_summary_models)?;
        validate_model_names("inference.sentiment_models", &self.sentiment_models)?;
        validate_model_names("inference.interpretation_models", &self.interpretation_models)?;
        validate_model_names("inference.transcription_models", &self.transcription_models)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseSettings {
    pub url: String,
    /// service role key 或 anon key，作為 `apikey` header
    pub api_key: String,
}

impl Validate for SupabaseSettings {
    fn validate(&self) -> Result<()> {
        validate_url("supabase.url", &self.url)?;
        validate_non_empty_string("supabase.api_key", &self.api_key)
    }
}

/// 夢境資料的儲存後端
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase(SupabaseSettings),
    /// 開發模式：記憶體儲存 + 固定 token 對應使用者
    Memory { tokens: HashMap<String, String> },
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Supabase(_) => "supabase",
            StoreBackend::Memory { .. } => "memory",
        }
    }
}

/// 合併 CLI、環境變數與 TOML 後的伺服器設定
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub store: StoreBackend,
    pub inference: InferenceSettings,
    pub transcribe_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Validate for ServerSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("server.host", &self.host)?;
        validate_range("server.port", self.port, 1, u16::MAX)?;
        validate_positive_number(
            "server.transcribe_timeout_seconds",
            self.transcribe_timeout.as_secs() as usize,
            1,
        )?;
        validate_positive_number("server.max_upload_bytes", self.max_upload_bytes, 1)?;

        match &self.store {
            StoreBackend::Supabase(supabase) => supabase.validate()?,
            StoreBackend::Memory { tokens } => {
                if tokens.is_empty() {
                    return Err(LucidlyError::ConfigValidationError {
                        field: "dev.tokens".to_string(),
                        message: "memory store needs at least one development token".to_string(),
                    });
                }
            }
        }

        self.inference.validate()
    }
}
