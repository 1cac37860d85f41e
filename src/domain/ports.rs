use crate::domain::model::{AuthUser, Dream, DreamPatch, NewDream, Sentiment};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 夢境儲存。`access_token` 會被轉交給後端，讓資料列層級權限生效。
#[async_trait]
pub trait DreamStore: Send + Sync {
    async fn list_for_user(&self, access_token: &str, user_id: &str) -> Result<Vec<Dream>>;
    async fn get(&self, access_token: &str, id: &str) -> Result<Dream>;
    async fn insert(&self, access_token: &str, user_id: &str, dream: &NewDream) -> Result<Dream>;
    async fn update(&self, access_token: &str, id: &str, patch: &DreamPatch) -> Result<Dream>;
    async fn delete(&self, access_token: &str, id: &str) -> Result<()>;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// 驗證 access token 並回傳使用者；無效或過期時回傳 `Unauthorized`
    async fn verify(&self, access_token: &str) -> Result<AuthUser>;
}

/// 託管推論服務提供的分析能力
#[async_trait]
pub trait DreamAnalyzer: Send + Sync {
    /// 是否已設定呼叫推論服務所需的憑證
    fn is_configured(&self) -> bool {
        true
    }

    /// 摘要，全部模型失敗時退回截斷文字
    async fn summarize(&self, text: &str) -> Result<String>;
    /// 摘要，全部模型失敗時回傳 `None`
    async fn summarize_strict(&self, text: &str) -> Result<Option<String>>;
    async fn analyze_sentiment(&self, text: &str) -> Result<Sentiment>;
    async fn interpret(&self, text: &str) -> Result<String>;
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String>;
}
