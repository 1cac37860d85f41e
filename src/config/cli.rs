use crate::config::toml_config::TomlConfig;
use crate::config::{
    InferenceSettings, ServerSettings, StoreBackend, SupabaseSettings, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_PORT, DEFAULT_TRANSCRIBE_TIMEOUT_SECS,
};
use crate::utils::error::{LucidlyError, Result};
use crate::utils::logger::LogFormat;
use crate::utils::validation::Validate;
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "lucidly")]
#[command(about = "Dream journal API server")]
pub struct ServerArgs {
    /// Path to an optional TOML configuration file
    #[arg(short, long, env = "LUCIDLY_CONFIG")]
    pub config: Option<String>,

    #[arg(long, env = "LUCIDLY_HOST")]
    pub host: Option<String>,

    #[arg(long, env = "LUCIDLY_PORT")]
    pub port: Option<u16>,

    /// Reported by the health endpoint
    #[arg(long, env = "LUCIDLY_ENV")]
    pub environment: Option<String>,

    /// Storage backend: supabase or memory
    #[arg(long)]
    pub store: Option<String>,

    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub supabase_service_role_key: Option<String>,

    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub supabase_anon_key: Option<String>,

    #[arg(long, env = "HF_API_KEY", hide_env_values = true)]
    pub hf_api_key: Option<String>,

    #[arg(long)]
    pub inference_base_url: Option<String>,

    #[arg(long)]
    pub transcribe_timeout_seconds: Option<u64>,

    /// Development token mapping for the memory store, as TOKEN=USER_ID
    #[arg(long = "dev-token", value_parser = parse_token_pair)]
    pub dev_tokens: Vec<(String, String)>,

    /// Log format: compact or json
    #[arg(long)]
    pub log_format: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

fn parse_token_pair(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((token, user)) if !token.is_empty() && !user.is_empty() => {
            Ok((token.to_string(), user.to_string()))
        }
        _ => Err(format!("expected TOKEN=USER_ID, got '{}'", raw)),
    }
}

impl ServerArgs {
    pub fn load_toml(&self) -> Result<TomlConfig> {
        match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                let config = TomlConfig::from_file(path)?;
                config.validate()?;
                Ok(config)
            }
            None => Ok(TomlConfig::default()),
        }
    }

    pub fn log_format(&self, file: &TomlConfig) -> LogFormat {
        self.log_format
            .as_deref()
            .or(file.logging().format.as_deref())
            .and_then(LogFormat::parse)
            .unwrap_or_default()
    }

    pub fn verbose(&self, file: &TomlConfig) -> bool {
        self.verbose || file.logging().verbose.unwrap_or(false)
    }

    /// CLI 與環境變數優先，其次是 TOML，最後是預設值
    pub fn resolve(&self, file: &TomlConfig) -> Result<ServerSettings> {
        let server = file.server();
        let supabase = file.supabase();

        let store_name = self
            .store
            .clone()
            .or(server.store)
            .unwrap_or_else(|| "supabase".to_string());

        let store = match store_name.as_str() {
            "supabase" => {
                let url = self
                    .supabase_url
                    .clone()
                    .or(supabase.url)
                    .ok_or_else(|| LucidlyError::MissingConfigError {
                        field: "supabase.url".to_string(),
                    })?;
                let api_key = self
                    .supabase_service_role_key
                    .clone()
                    .or(supabase.service_role_key)
                    .or_else(|| self.supabase_anon_key.clone())
                    .or(supabase.anon_key)
                    .ok_or_else(|| LucidlyError::MissingConfigError {
                        field: "supabase.service_role_key".to_string(),
                    })?;
                StoreBackend::Supabase(SupabaseSettings { url, api_key })
            }
            "memory" => {
                let mut tokens = file.dev_tokens();
                tokens.extend(self.dev_tokens.iter().cloned());
                StoreBackend::Memory { tokens }
            }
            other => {
                return Err(LucidlyError::InvalidConfigValueError {
                    field: "store".to_string(),
                    value: other.to_string(),
                    reason: "Valid stores: supabase, memory".to_string(),
                })
            }
        };

        Ok(ServerSettings {
            host: self
                .host
                .clone()
                .or(server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: self.port.or(server.port).unwrap_or(DEFAULT_PORT),
            environment: self
                .environment
                .clone()
                .or(server.environment)
                .unwrap_or_else(|| "development".to_string()),
            store,
            inference: self.resolve_inference(file),
            transcribe_timeout: Duration::from_secs(
                self.transcribe_timeout_seconds
                    .or(server.transcribe_timeout_seconds)
                    .unwrap_or(DEFAULT_TRANSCRIBE_TIMEOUT_SECS),
            ),
            max_upload_bytes: server.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }

    fn resolve_inference(&self, file: &TomlConfig) -> InferenceSettings {
        let section = file.inference();
        let defaults = InferenceSettings::default();

        InferenceSettings {
            base_url: self
                .inference_base_url
                .clone()
                .or(section.base_url)
                .unwrap_or(defaults.base_url),
            api_key: self
                .hf_api_key
                .clone()
                .or(section.api_key)
                .filter(|k| !k.trim().is_empty()),
            request_timeout: section
                .request_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            summary_models: section.summary_models.unwrap_or(defaults.summary_models),
            strict_summary_models: section
                .strict_summary_models
                .unwrap_or(defaults.strict_summary_models),
            sentiment_models: section.sentiment_models.unwrap_or(defaults.sentiment_models),
            interpretation_models: section
                .interpretation_models
                .unwrap_or(defaults.interpretation_models),
            transcription_models: section
                .transcription_models
                .unwrap_or(defaults.transcription_models),
        }
    }
}
