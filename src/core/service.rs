use crate::domain::model::{
    AnalysisRequest, AuthUser, Dream, DreamPatch, Message, NewDream, SummaryRequest,
    SummaryResult,
};
use crate::domain::ports::{DreamAnalyzer, DreamStore};
use crate::utils::error::{LucidlyError, Result};
use std::sync::Arc;
use std::time::Duration;

/// 已通過驗證的呼叫者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user: AuthUser,
    pub access_token: String,
}

impl Caller {
    pub fn new(user: AuthUser, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: access_token.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

/// 夢境日誌的業務流程：儲存、分析與轉錄
pub struct DreamService {
    store: Arc<dyn DreamStore>,
    analyzer: Arc<dyn DreamAnalyzer>,
    transcribe_timeout: Duration,
}

impl DreamService {
    pub fn new(
        store: Arc<dyn DreamStore>,
        analyzer: Arc<dyn DreamAnalyzer>,
        transcribe_timeout: Duration,
    ) -> Self {
        Self {
            store,
            analyzer,
            transcribe_timeout,
        }
    }

    pub async fn list(&self, caller: &Caller) -> Result<Vec<Dream>> {
        self.store
            .list_for_user(&caller.access_token, caller.user_id())
            .await
            .map_err(store_failure("Failed to fetch dreams"))
    }

    pub async fn create(&self, caller: &Caller, dream: NewDream) -> Result<Dream> {
        if !dream.has_text() {
            return Err(LucidlyError::validation(
                "Either content or transcript is required",
            ));
        }

        let created = self
            .store
            .insert(&caller.access_token, caller.user_id(), &dream)
            .await
            .map_err(store_failure("Failed to create dream"))?;

        tracing::info!("📝 Dream {} created for user {}", created.id, caller.user_id());
        Ok(created)
    }

    pub async fn get(&self, caller: &Caller, id: &str) -> Result<Dream> {
        self.load_owned(caller, id).await
    }

    pub async fn put_summary(&self, caller: &Caller, id: &str, summary: Option<String>) -> Result<Dream> {
        let summary = summary
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LucidlyError::validation("Summary is required"))?;

        self.load_owned(caller, id).await?;

        let patch = DreamPatch {
            summary: Some(summary),
            ..Default::default()
        };
        self.write_patch(caller, id, &patch).await
    }

    /// 只產生被要求且尚未存在的欄位；單一欄位失敗不影響其他欄位
    pub async fn analyze(&self, caller: &Caller, id: &str, request: AnalysisRequest) -> Result<Dream> {
        let dream = self.load_owned(caller, id).await?;

        let text = dream
            .analysis_text()
            .ok_or_else(|| LucidlyError::validation("No content available for processing"))?
            .to_string();

        let mut patch = DreamPatch::default();

        if request.generate_summary && dream.summary.is_none() {
            match self.analyzer.summarize(&text).await {
                Ok(summary) => patch.summary = Some(summary),
                Err(e) => tracing::warn!("⚠️ Summary generation failed for {}: {}", id, e),
            }
        }

        if request.generate_sentiment && dream.sentiment.is_none() {
            match self.analyzer.analyze_sentiment(&text).await {
                Ok(sentiment) => patch.sentiment = Some(sentiment),
                Err(e) => tracing::warn!("⚠️ Sentiment analysis failed for {}: {}", id, e),
            }
        }

        if request.generate_interpretation && dream.interpretation.is_none() {
            match self.analyzer.interpret(&text).await {
                Ok(interpretation) => patch.interpretation = Some(interpretation),
                Err(e) => tracing::warn!("⚠️ Interpretation failed for {}: {}", id, e),
            }
        }

        if patch.is_empty() {
            tracing::debug!("Nothing to update for dream {}", id);
            return Ok(dream);
        }

        self.write_patch(caller, id, &patch).await
    }

    pub async fn delete(&self, caller: &Caller, id: &str) -> Result<Message> {
        self.load_owned(caller, id).await?;

        self.store
            .delete(&caller.access_token, id)
            .await
            .map_err(store_failure("Failed to delete dream"))?;

        tracing::info!("🗑️ Dream {} deleted", id);
        Ok(Message {
            message: "Dream deleted successfully".to_string(),
        })
    }

    /// 嚴格摘要：所有模型都失敗時不退回截斷文字，而是回報錯誤
    pub async fn summarize_and_save(&self, caller: &Caller, request: SummaryRequest) -> Result<SummaryResult> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        let (Some(dream_id), Some(text)) = (non_empty(request.dream_id), non_empty(request.text))
        else {
            return Err(LucidlyError::validation("Dream ID and text are required"));
        };

        self.load_owned(caller, &dream_id).await?;

        let summary = match self.analyzer.summarize_strict(&text).await {
            Ok(summary) => summary,
            Err(LucidlyError::MissingConfigError { field }) => {
                tracing::error!("❌ Summarization unavailable, missing {}", field);
                None
            }
            Err(e) => return Err(e),
        }
        .ok_or_else(|| LucidlyError::internal("All summarization models failed. Try again later."))?;

        let patch = DreamPatch {
            summary: Some(summary.clone()),
            ..Default::default()
        };
        self.write_patch(caller, &dream_id, &patch).await?;

        Ok(SummaryResult {
            success: true,
            summary,
            dream_id,
        })
    }

    pub async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String> {
        if !self.analyzer.is_configured() {
            return Err(LucidlyError::internal("Hugging Face API key not configured"));
        }
        if audio.is_empty() {
            return Err(LucidlyError::validation("No audio file provided"));
        }

        tracing::info!("🎙️ Transcribing {} bytes ({})", audio.len(), mime_type);

        match tokio::time::timeout(self.transcribe_timeout, self.analyzer.transcribe(audio, mime_type)).await {
            Ok(Ok(transcript)) => Ok(transcript),
            Ok(Err(e)) => {
                tracing::error!("❌ Transcription failed: {}", e);
                Err(LucidlyError::internal(format!("Transcription failed: {}", e)))
            }
            Err(_) => {
                tracing::warn!("⏰ Transcription exceeded {:?}", self.transcribe_timeout);
                Err(LucidlyError::TimeoutError {
                    message: "Transcription took too long. Please try again with a shorter recording."
                        .to_string(),
                })
            }
        }
    }

    /// 讀取夢境；不屬於呼叫者的紀錄視同不存在
    async fn load_owned(&self, caller: &Caller, id: &str) -> Result<Dream> {
        let dream = self
            .store
            .get(&caller.access_token, id)
            .await
            .map_err(store_failure("Failed to fetch dream"))?;

        if dream.user_id != caller.user_id() {
            tracing::warn!("User {} requested dream {} owned by someone else", caller.user_id(), id);
            return Err(dream_not_found());
        }
        Ok(dream)
    }

    async fn write_patch(&self, caller: &Caller, id: &str, patch: &DreamPatch) -> Result<Dream> {
        self.store
            .update(&caller.access_token, id, patch)
            .await
            .map_err(store_failure("Failed to update dream"))
    }
}

fn dream_not_found() -> LucidlyError {
    LucidlyError::not_found("Dream not found")
}

/// 儲存層錯誤轉成對外訊息；找不到與未授權原樣保留
fn store_failure(operation: &'static str) -> impl FnOnce(LucidlyError) -> LucidlyError {
    move |e| match e {
        LucidlyError::NotFound { .. } => dream_not_found(),
        e @ LucidlyError::Unauthorized { .. } => e,
        e => {
            tracing::error!("❌ {}: {}", operation, e);
            LucidlyError::internal(operation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::domain::model::Sentiment;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubAnalyzer {
        unconfigured: bool,
        fail_sentiment: bool,
        strict_fails: bool,
        transcribe_delay: Option<Duration>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DreamAnalyzer for StubAnalyzer {
        fn is_configured(&self) -> bool {
            !self.unconfigured
        }

        async fn summarize(&self, text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("summary of {}", text))
        }

        async fn summarize_strict(&self, text: &str) -> Result<Option<String>> {
            if self.unconfigured {
                return Err(LucidlyError::MissingConfigError {
                    field: "HF_API_KEY".to_string(),
                });
            }
            if self.strict_fails {
                return Ok(None);
            }
            Ok(Some(format!("strict summary of {}", text)))
        }

        async fn analyze_sentiment(&self, _text: &str) -> Result<Sentiment> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_sentiment {
                return Err(LucidlyError::upstream("huggingface", 500, "boom"));
            }
            Ok(Sentiment {
                label: "POSITIVE".to_string(),
                score: 0.9,
            })
        }

        async fn interpret(&self, _text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("an interpretation".to_string())
        }

        async fn transcribe(&self, audio: &[u8], _mime_type: &str) -> Result<String> {
            if let Some(delay) = self.transcribe_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(format!("{} bytes", audio.len()))
        }
    }

    fn caller(id: &str) -> Caller {
        Caller::new(
            AuthUser {
                id: id.to_string(),
                email: None,
            },
            format!("token-{}", id),
        )
    }

    fn service_with(analyzer: StubAnalyzer) -> (DreamService, MemoryStore, Arc<StubAnalyzer>) {
        let store = MemoryStore::new();
        let analyzer = Arc::new(analyzer);
        let service = DreamService::new(
            Arc::new(store.clone()),
            analyzer.clone(),
            Duration::from_millis(50),
        );
        (service, store, analyzer)
    }

    fn new_dream(content: &str) -> NewDream {
        NewDream {
            content: Some(content.to_string()),
            transcript: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_text() {
        let (service, store, _) = service_with(StubAnalyzer::default());

        let err = service
            .create(&caller("u1"), NewDream::default())
            .await
            .unwrap_err();
        assert_eq!(err.user_friendly_message(), "Either content or transcript is required");
        assert!(store.is_empty().await);

        let dream = service
            .create(
                &caller("u1"),
                NewDream {
                    content: None,
                    transcript: Some("spoken words".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(dream.content, "");
        assert_eq!(dream.transcript.as_deref(), Some("spoken words"));
        assert_eq!(dream.user_id, "u1");
    }

    #[tokio::test]
    async fn test_foreign_dream_is_not_found() {
        let (service, _, _) = service_with(StubAnalyzer::default());
        let dream = service.create(&caller("u1"), new_dream("mine")).await.unwrap();

        let err = service.get(&caller("u2"), &dream.id).await.unwrap_err();
        assert!(matches!(err, LucidlyError::NotFound { .. }));
        assert_eq!(err.user_friendly_message(), "Dream not found");

        let err = service.delete(&caller("u2"), &dream.id).await.unwrap_err();
        assert!(matches!(err, LucidlyError::NotFound { .. }));

        assert_eq!(service.list(&caller("u2")).await.unwrap().len(), 0);
        assert_eq!(service.list(&caller("u1")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_summary_rejects_empty() {
        let (service, _, _) = service_with(StubAnalyzer::default());
        let dream = service.create(&caller("u1"), new_dream("text")).await.unwrap();

        let err = service
            .put_summary(&caller("u1"), &dream.id, Some(String::new()))
            .await
            .unwrap_err();
        assert_eq!(err.user_friendly_message(), "Summary is required");

        let err = service
            .put_summary(&caller("u1"), &dream.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.user_friendly_message(), "Summary is required");

        // 只有空字串會被拒絕，空白內容照樣儲存
        let updated = service
            .put_summary(&caller("u1"), &dream.id, Some("  ".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.summary.as_deref(), Some("  "));

        let updated = service
            .put_summary(&caller("u1"), &dream.id, Some("short".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.summary.as_deref(), Some("short"));
    }

    #[tokio::test]
    async fn test_analyze_skips_failed_and_existing_fields() {
        let (service, _, analyzer) = service_with(StubAnalyzer {
            fail_sentiment: true,
            ..Default::default()
        });
        let dream = service.create(&caller("u1"), new_dream("a tall tower")).await.unwrap();
        service
            .put_summary(&caller("u1"), &dream.id, Some("kept".to_string()))
            .await
            .unwrap();

        let updated = service
            .analyze(&caller("u1"), &dream.id, AnalysisRequest::all())
            .await
            .unwrap();

        assert_eq!(updated.summary.as_deref(), Some("kept"));
        assert!(updated.sentiment.is_none());
        assert_eq!(updated.interpretation.as_deref(), Some("an interpretation"));
        // summary 已存在，不會再呼叫
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_analyze_without_text_is_rejected() {
        let (service, store, _) = service_with(StubAnalyzer::default());
        store
            .put(Dream {
                id: "empty".to_string(),
                user_id: "u1".to_string(),
                content: String::new(),
                transcript: None,
                summary: None,
                sentiment: None,
                interpretation: None,
                created_at: chrono::Utc::now(),
            })
            .await;

        let err = service
            .analyze(&caller("u1"), "empty", AnalysisRequest::all())
            .await
            .unwrap_err();
        assert_eq!(err.user_friendly_message(), "No content available for processing");
    }

    #[tokio::test]
    async fn test_analyze_with_no_flags_returns_dream_unchanged() {
        let (service, _, analyzer) = service_with(StubAnalyzer::default());
        let dream = service.create(&caller("u1"), new_dream("text")).await.unwrap();

        let same = service
            .analyze(&caller("u1"), &dream.id, AnalysisRequest::default())
            .await
            .unwrap();
        assert_eq!(same, dream);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_summarize_and_save() {
        let (service, _, _) = service_with(StubAnalyzer::default());
        let dream = service.create(&caller("u1"), new_dream("text")).await.unwrap();

        let err = service
            .summarize_and_save(
                &caller("u1"),
                SummaryRequest {
                    dream_id: Some(dream.id.clone()),
                    text: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.user_friendly_message(), "Dream ID and text are required");

        let result = service
            .summarize_and_save(
                &caller("u1"),
                SummaryRequest {
                    dream_id: Some(dream.id.clone()),
                    text: Some("the text".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.summary, "strict summary of the text");
        assert_eq!(
            service.get(&caller("u1"), &dream.id).await.unwrap().summary,
            Some("strict summary of the text".to_string())
        );

        // 只有空字串會被拒絕
        let result = service
            .summarize_and_save(
                &caller("u1"),
                SummaryRequest {
                    dream_id: Some(dream.id.clone()),
                    text: Some(" ".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(result.summary, "strict summary of  ");
    }

    #[tokio::test]
    async fn test_summarize_and_save_reports_total_failure() {
        let (service, _, _) = service_with(StubAnalyzer {
            strict_fails: true,
            ..Default::default()
        });
        let dream = service.create(&caller("u1"), new_dream("text")).await.unwrap();

        let err = service
            .summarize_and_save(
                &caller("u1"),
                SummaryRequest {
                    dream_id: Some(dream.id),
                    text: Some("x".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LucidlyError::Internal { .. }));
        assert_eq!(err.to_string(), "All summarization models failed. Try again later.");
    }

    #[tokio::test]
    async fn test_summarize_and_save_without_api_key() {
        let (service, _, _) = service_with(StubAnalyzer {
            unconfigured: true,
            ..Default::default()
        });
        let dream = service.create(&caller("u1"), new_dream("text")).await.unwrap();

        let err = service
            .summarize_and_save(
                &caller("u1"),
                SummaryRequest {
                    dream_id: Some(dream.id.clone()),
                    text: Some("x".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.user_friendly_message(), "All summarization models failed. Try again later.");
        assert!(service.get(&caller("u1"), &dream.id).await.unwrap().summary.is_none());
    }

    #[tokio::test]
    async fn test_transcribe_guards_and_timeout() {
        let (service, _, _) = service_with(StubAnalyzer {
            unconfigured: true,
            ..Default::default()
        });
        let err = service.transcribe(b"RIFF", "audio/wav").await.unwrap_err();
        assert_eq!(err.to_string(), "Hugging Face API key not configured");

        let (service, _, _) = service_with(StubAnalyzer::default());
        let err = service.transcribe(&[], "audio/wav").await.unwrap_err();
        assert_eq!(err.user_friendly_message(), "No audio file provided");
        assert_eq!(service.transcribe(b"RIFF", "audio/wav").await.unwrap(), "4 bytes");

        let (service, _, _) = service_with(StubAnalyzer {
            transcribe_delay: Some(Duration::from_millis(500)),
            ..Default::default()
        });
        let err = service.transcribe(b"RIFF", "audio/wav").await.unwrap_err();
        assert!(matches!(err, LucidlyError::TimeoutError { .. }));
    }
}
