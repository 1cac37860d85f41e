use crate::utils::error::{LucidlyError, Result};
use std::future::Future;

/// 依序嘗試每個模型，回傳第一個可用的結果。
///
/// `attempt` 回傳 `Ok(Some(_))` 代表成功；`Ok(None)` 代表回應格式無法使用；
/// `Err(_)` 代表請求失敗。後兩者都會記錄後繼續嘗試下一個模型。
/// 全部失敗時回傳 `None`，由呼叫端決定退回值。
pub async fn try_in_order<T, F, Fut>(task: &str, models: &[String], mut attempt: F) -> Option<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for model in models {
        tracing::debug!("🔄 Trying {} with model: {}", task, model);

        match attempt(model.clone()).await {
            Ok(Some(value)) => {
                tracing::info!("✅ {} succeeded with model {}", task, model);
                return Some(value);
            }
            Ok(None) => {
                tracing::warn!("⚠️ {} model {} returned an unusable response", task, model);
            }
            Err(LucidlyError::UpstreamError { status: 503, .. }) => {
                tracing::info!("⏳ {} model {} is loading, trying next model", task, model);
            }
            Err(e) => {
                tracing::warn!("⚠️ {} model {} failed: {}", task, model, e);
            }
        }
    }

    tracing::warn!("❌ All {} models failed", task);
    None
}
