use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::text::extract_title;

/// 資料庫中的一筆夢境紀錄（對應 `dreams` 資料表）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dream {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub interpretation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Dream {
    /// 分析用的文字：優先使用 content，其次 transcript
    pub fn analysis_text(&self) -> Option<&str> {
        if !self.content.is_empty() {
            return Some(&self.content);
        }
        self.transcript.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: String,
    pub score: f64,
}

impl Sentiment {
    pub fn neutral() -> Self {
        Self {
            label: "NEUTRAL".to_string(),
            score: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Lucid,
    Nightmare,
    Peaceful,
    Vivid,
}

impl Mood {
    pub fn from_sentiment(sentiment: Option<&Sentiment>) -> Self {
        let Some(sentiment) = sentiment else {
            return Mood::Peaceful;
        };

        let label = sentiment.label.to_lowercase();
        let score = sentiment.score;

        if label == "positive" && score > 0.7 {
            Mood::Lucid
        } else if label == "negative" && score > 0.6 {
            Mood::Nightmare
        } else if label == "positive" {
            Mood::Peaceful
        } else if score > 0.8 {
            Mood::Vivid
        } else {
            Mood::Peaceful
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Lucid => "lucid",
            Mood::Nightmare => "nightmare",
            Mood::Peaceful => "peaceful",
            Mood::Vivid => "vivid",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// 建立夢境的請求內容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDream {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

impl NewDream {
    pub fn has_text(&self) -> bool {
        let non_empty = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        non_empty(&self.content) || non_empty(&self.transcript)
    }
}

/// PATCH 請求：要求產生哪些 AI 分析欄位
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisRequest {
    pub generate_summary: bool,
    pub generate_sentiment: bool,
    pub generate_interpretation: bool,
}

impl AnalysisRequest {
    pub fn all() -> Self {
        Self {
            generate_summary: true,
            generate_sentiment: true,
            generate_interpretation: true,
        }
    }
}

/// 寫回資料庫的欄位，只序列化有值的欄位
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DreamPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
}

impl DreamPatch {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.sentiment.is_none() && self.interpretation.is_none()
    }

    pub fn apply_to(&self, dream: &mut Dream) {
        if let Some(summary) = &self.summary {
            dream.summary = Some(summary.clone());
        }
        if let Some(sentiment) = &self.sentiment {
            dream.sentiment = Some(sentiment.clone());
        }
        if let Some(interpretation) = &self.interpretation {
            dream.interpretation = Some(interpretation.clone());
        }
    }
}

/// 夢境加上前端顯示用的衍生欄位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreamView {
    #[serde(flatten)]
    pub dream: Dream,
    pub title: String,
    pub mood: Mood,
    pub date: String,
    pub tags: Vec<String>,
}

impl From<Dream> for DreamView {
    fn from(dream: Dream) -> Self {
        Self {
            title: extract_title(&dream.content),
            mood: Mood::from_sentiment(dream.sentiment.as_ref()),
            date: dream.created_at.format("%B %-d, %Y").to_string(),
            tags: Vec::new(),
            dream,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// 登入後取得的工作階段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

/// 所有 API 回應共用的外層格式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub environment: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRequest {
    #[serde(rename = "dreamId", default)]
    pub dream_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub success: bool,
    pub summary: String,
    #[serde(rename = "dreamId")]
    pub dream_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryUpdate {
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub transcript: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}
