use crate::domain::model::{AuthUser, Dream, DreamPatch, NewDream};
use crate::domain::ports::{AuthProvider, DreamStore};
use crate::utils::error::{LucidlyError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 記憶體內的夢境儲存，用於本機開發與測試
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    dreams: Arc<RwLock<HashMap<String, Dream>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.dreams.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.dreams.read().await.is_empty()
    }

    /// 直接放入一筆紀錄（測試用的種子資料）
    pub async fn put(&self, dream: Dream) {
        self.dreams.write().await.insert(dream.id.clone(), dream);
    }
}

#[async_trait]
impl DreamStore for MemoryStore {
    async fn list_for_user(&self, _access_token: &str, user_id: &str) -> Result<Vec<Dream>> {
        let dreams = self.dreams.read().await;
        let mut owned: Vec<Dream> = dreams
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn get(&self, _access_token: &str, id: &str) -> Result<Dream> {
        self.dreams
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| LucidlyError::not_found(format!("Dream {} not found", id)))
    }

    async fn insert(&self, _access_token: &str, user_id: &str, dream: &NewDream) -> Result<Dream> {
        let record = Dream {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            content: dream.content.clone().unwrap_or_default(),
            transcript: dream.transcript.clone().filter(|t| !t.is_empty()),
            summary: None,
            sentiment: None,
            interpretation: None,
            created_at: Utc::now(),
        };

        self.dreams
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update(&self, _access_token: &str, id: &str, patch: &DreamPatch) -> Result<Dream> {
        let mut dreams = self.dreams.write().await;
        let dream = dreams
            .get_mut(id)
            .ok_or_else(|| LucidlyError::not_found(format!("Dream {} not found", id)))?;
        patch.apply_to(dream);
        Ok(dream.clone())
    }

    async fn delete(&self, _access_token: &str, id: &str) -> Result<()> {
        self.dreams.write().await.remove(id);
        Ok(())
    }
}

/// 固定 token 對應使用者的驗證器（開發模式）
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuth {
    tokens: HashMap<String, AuthUser>,
}

impl StaticTokenAuth {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        let tokens = tokens
            .into_iter()
            .map(|(token, user_id)| {
                (
                    token,
                    AuthUser {
                        id: user_id,
                        email: None,
                    },
                )
            })
            .collect();
        Self { tokens }
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn verify(&self, access_token: &str) -> Result<AuthUser> {
        self.tokens
            .get(access_token)
            .cloned()
            .ok_or_else(|| LucidlyError::unauthorized("Invalid or expired token"))
    }
}
