use crate::config::InferenceSettings;
use crate::core::cascade::try_in_order;
use crate::domain::model::Sentiment;
use crate::domain::ports::DreamAnalyzer;
use crate::utils::error::{LucidlyError, Result};
use crate::utils::text::{ellipsize, stable_index, truncate_chars};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{header, Client};
use serde_json::{json, Value};

const SUMMARY_INPUT_CHARS: usize = 1000;
const SUMMARY_MAX_CHARS: usize = 150;
const SENTIMENT_INPUT_CHARS: usize = 500;
const INTERPRETATION_INPUT_CHARS: usize = 300;
const INTERPRETATION_MAX_CHARS: usize = 200;
const INTERPRETATION_MIN_CHARS: usize = 10;

pub const TRANSCRIPTION_FALLBACK: &str = "I received your audio recording but couldn't transcribe it automatically. Please try again or type your dream content manually.";

pub const INTERPRETATION_FALLBACKS: [&str; 5] = [
    "This dream reflects your subconscious processing of recent experiences and emotions.",
    "The imagery in this dream suggests themes of transformation and personal growth.",
    "This dream may represent your mind working through challenges or aspirations.",
    "The symbolism indicates a journey of self-discovery and inner reflection.",
    "This dream could signify your unconscious desires for change or resolution.",
];

/// Hugging Face Inference API 客戶端
#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    client: Client,
    settings: InferenceSettings,
}

impl HuggingFaceClient {
    pub fn new(settings: InferenceSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn has_api_key(&self) -> bool {
        self.settings.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.settings
            .api_key
            .as_deref()
            .ok_or_else(|| LucidlyError::MissingConfigError {
                field: "HF_API_KEY".to_string(),
            })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), model)
    }

    async fn post_json(&self, api_key: &str, model: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(self.model_url(model))
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;

        Self::read_json(model, response).await
    }

    async fn post_audio(
        &self,
        api_key: &str,
        model: &str,
        audio: &[u8],
        mime_type: &str,
    ) -> Result<Value> {
        let response = self
            .client
            .post(self.model_url(model))
            .bearer_auth(api_key)
            .header(header::CONTENT_TYPE, mime_type)
            .body(audio.to_vec())
            .send()
            .await?;

        Self::read_json(model, response).await
    }

    async fn read_json(model: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Model {} error response: {}", model, body);
            return Err(LucidlyError::upstream(
                "huggingface",
                status.as_u16(),
                format!("model {}: {}", model, body),
            ));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DreamAnalyzer for HuggingFaceClient {
    fn is_configured(&self) -> bool {
        self.has_api_key()
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let body = summary_body(text);

        let summary = try_in_order("summarization", &self.settings.summary_models, |model| {
            let body = &body;
            async move {
                let result = self.post_json(api_key, &model, body).await?;
                Ok(parse_summary(&result, true))
            }
        })
        .await;

        Ok(summary.unwrap_or_else(|| {
            tracing::info!("All summarization models failed, using truncation fallback");
            ellipsize(text, SUMMARY_MAX_CHARS)
        }))
    }

    async fn summarize_strict(&self, text: &str) -> Result<Option<String>> {
        let api_key = self.api_key()?;
        let body = summary_body(text);

        Ok(
            try_in_order("summarization", &self.settings.strict_summary_models, |model| {
                let body = &body;
                async move {
                    let result = self.post_json(api_key, &model, body).await?;
                    Ok(parse_summary(&result, false))
                }
            })
            .await,
        )
    }

    async fn analyze_sentiment(&self, text: &str) -> Result<Sentiment> {
        let api_key = self.api_key()?;
        let body = json!({ "inputs": truncate_chars(text, SENTIMENT_INPUT_CHARS) });

        let sentiment = try_in_order("sentiment analysis", &self.settings.sentiment_models, |model| {
            let body = &body;
            async move {
                let result = self.post_json(api_key, &model, body).await?;
                Ok(parse_sentiment(&result))
            }
        })
        .await;

        Ok(sentiment.unwrap_or_else(|| {
            tracing::info!("All sentiment models failed, using neutral fallback");
            Sentiment::neutral()
        }))
    }

    async fn interpret(&self, text: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let dream_text = truncate_chars(text, INTERPRETATION_INPUT_CHARS);

        let interpretation = try_in_order(
            "dream interpretation",
            &self.settings.interpretation_models,
            |model| async move {
                let prompt = interpretation_prompt(&model, dream_text);
                let body = json!({
                    "inputs": prompt,
                    "parameters": {
                        "max_length": 200,
                        "temperature": 0.7,
                        "do_sample": true,
                    },
                });
                let result = self.post_json(api_key, &model, &body).await?;
                Ok(parse_interpretation(&result, &prompt))
            },
        )
        .await;

        Ok(interpretation.unwrap_or_else(|| {
            tracing::info!("All interpretation models failed, using canned interpretation");
            fallback_interpretation(text).to_string()
        }))
    }

    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String> {
        let api_key = self.api_key()?;
        tracing::debug!("🎙️ Transcribing {} bytes of {}", audio.len(), mime_type);

        let transcript = try_in_order("transcription", &self.settings.transcription_models, |model| {
            async move {
                let result = self.post_audio(api_key, &model, audio, mime_type).await?;
                Ok(parse_transcript(&result))
            }
        })
        .await;

        Ok(transcript.unwrap_or_else(|| {
            tracing::warn!("All transcription models failed, returning fallback message");
            TRANSCRIPTION_FALLBACK.to_string()
        }))
    }
}

fn summary_body(text: &str) -> Value {
    json!({
        "inputs": truncate_chars(text, SUMMARY_INPUT_CHARS),
        "parameters": {
            "max_length": 150,
            "min_length": 30,
            "do_sample": false,
        },
    })
}

fn first_string<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value
        .get(0)
        .and_then(|first| first.get(field))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// `[{summary_text}]`；允許時也接受 `[{generated_text}]`（截斷至 150 字元）
pub fn parse_summary(value: &Value, allow_generated: bool) -> Option<String> {
    if let Some(summary) = first_string(value, "summary_text") {
        return Some(summary.to_string());
    }
    if allow_generated {
        if let Some(generated) = first_string(value, "generated_text") {
            return Some(truncate_chars(generated, SUMMARY_MAX_CHARS).to_string());
        }
    }
    None
}

fn sentiment_from(value: &Value) -> Option<Sentiment> {
    let label = value.get("label")?.as_str()?;
    let score = value.get("score")?.as_f64()?;
    Some(Sentiment {
        label: label.to_string(),
        score,
    })
}

/// 接受 `[{label,score}]`、`[[{label,score},...]]`（取最高分）或單一 `{label,score}`
pub fn parse_sentiment(value: &Value) -> Option<Sentiment> {
    match value {
        Value::Array(items) => match items.first()? {
            Value::Array(candidates) => candidates
                .iter()
                .filter_map(sentiment_from)
                .max_by(|a, b| a.score.total_cmp(&b.score)),
            first => sentiment_from(first),
        },
        Value::Object(_) => sentiment_from(value),
        _ => None,
    }
}

pub fn interpretation_prompt(model: &str, dream_text: &str) -> String {
    if model.contains("flan-t5") {
        format!("Interpret this dream: {}", dream_text)
    } else {
        format!("Dream: {}\nInterpretation: This dream suggests", dream_text)
    }
}

/// 去掉回應中的 prompt，過短的結果視為無效
pub fn parse_interpretation(value: &Value, prompt: &str) -> Option<String> {
    let generated = first_string(value, "generated_text")?;
    let interpretation = generated.replacen(prompt, "", 1);
    let interpretation = interpretation.trim();

    if interpretation.chars().count() <= INTERPRETATION_MIN_CHARS {
        return None;
    }

    if interpretation.chars().count() > INTERPRETATION_MAX_CHARS {
        Some(format!(
            "{}...",
            truncate_chars(interpretation, INTERPRETATION_MAX_CHARS)
        ))
    } else {
        Some(interpretation.to_string())
    }
}

pub fn fallback_interpretation(text: &str) -> &'static str {
    INTERPRETATION_FALLBACKS[stable_index(text, INTERPRETATION_FALLBACKS.len())]
}

fn non_empty_trimmed(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// 處理 Inference API 各種語音辨識回應格式
pub fn parse_transcript(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty_trimmed(s),
        Value::Array(items) => {
            let first = items.first()?;
            first
                .get("text")
                .and_then(Value::as_str)
                .or_else(|| first.get("generated_text").and_then(Value::as_str))
                .and_then(non_empty_trimmed)
        }
        Value::Object(_) => match value.get("text").and_then(Value::as_str) {
            Some(text) => non_empty_trimmed(text),
            None => scan_for_text(value),
        },
        _ => None,
    }
}

/// 最後手段：在序列化後的 JSON 中尋找任何 `text` / `generated_text` 欄位
fn scan_for_text(value: &Value) -> Option<String> {
    tracing::debug!("Unexpected transcription result format: {}", value);
    let serialized = value.to_string();
    let re = Regex::new(r#""(?:text|generated_text)":"([^"]*)""#).ok()?;
    re.captures(&serialized)
        .and_then(|caps| caps.get(1))
        .and_then(|m| non_empty_trimmed(m.as_str()))
}
