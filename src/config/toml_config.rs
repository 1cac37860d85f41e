use crate::utils::error::{LucidlyError, Result};
use crate::utils::validation::{validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// `lucidly.toml` 的內容，所有區段皆為選填，缺少的值由 CLI/環境變數或預設值補上
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub server: Option<ServerSection>,
    pub supabase: Option<SupabaseSection>,
    pub inference: Option<InferenceSection>,
    pub dev: Option<DevSection>,
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub environment: Option<String>,
    /// "supabase" 或 "memory"
    pub store: Option<String>,
    pub transcribe_timeout_seconds: Option<u64>,
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupabaseSection {
    pub url: Option<String>,
    pub service_role_key: Option<String>,
    pub anon_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_seconds: Option<u64>,
    pub summary_models: Option<Vec<String>>,
    pub strict_summary_models: Option<Vec<String>>,
    pub sentiment_models: Option<Vec<String>>,
    pub interpretation_models: Option<Vec<String>>,
    pub transcription_models: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevSection {
    /// access token -> user id
    pub tokens: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    pub format: Option<String>,
    pub verbose: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LucidlyError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LucidlyError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${HF_API_KEY})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LucidlyError::config(e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn server(&self) -> ServerSection {
        self.server.clone().unwrap_or_default()
    }

    pub fn supabase(&self) -> SupabaseSection {
        self.supabase.clone().unwrap_or_default()
    }

    pub fn inference(&self) -> InferenceSection {
        self.inference.clone().unwrap_or_default()
    }

    pub fn dev_tokens(&self) -> HashMap<String, String> {
        self.dev
            .as_ref()
            .and_then(|d| d.tokens.clone())
            .unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingSection {
        self.logging.clone().unwrap_or_default()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(url) = self.supabase.as_ref().and_then(|s| s.url.as_deref()) {
            validate_url("supabase.url", url)?;
        }
        if let Some(url) = self.inference.as_ref().and_then(|s| s.base_url.as_deref()) {
            validate_url("inference.base_url", url)?;
        }
        if let Some(store) = self.server.as_ref().and_then(|s| s.store.as_deref()) {
            if !matches!(store, "supabase" | "memory") {
                return Err(LucidlyError::InvalidConfigValueError {
                    field: "server.store".to_string(),
                    value: store.to_string(),
                    reason: "Valid stores: supabase, memory".to_string(),
                });
            }
        }
        Ok(())
    }
}
