use reqwest::{multipart, Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::adapters::SupabaseAuth;
use crate::client::jwt::is_token_expired;
use crate::domain::model::{
    AnalysisRequest, ApiResponse, Dream, HealthStatus, Message, NewDream, Session, SummaryResult,
    Transcript,
};
use crate::utils::error::{LucidlyError, Result};

const API_PREFIX: &str = "/api";

/// Lucidly API 客戶端。
///
/// 每個請求前檢查 token 是否過期並嘗試刷新；所有失敗都以
/// `ApiResponse { success: false, error }` 回傳，不會變成 `Err`。
pub struct LucidlyClient {
    base_url: String,
    http: Client,
    auth: Option<SupabaseAuth>,
    session: Mutex<Option<Session>>,
}

impl LucidlyClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url).map_err(|e| LucidlyError::InvalidConfigValueError {
            field: "api_url".to_string(),
            value: base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::builder().build()?,
            auth: None,
            session: Mutex::new(None),
        })
    }

    /// 設定用來登入與刷新 token 的 auth 服務
    pub fn with_auth(mut self, auth: SupabaseAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_session(self, session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
            ..self
        }
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let auth = self.auth_service()?;
        let session = auth.sign_in_with_password(email, password).await?;
        *self.session.lock().await = Some(session.clone());
        tracing::info!("🔑 Signed in as {}", email);
        Ok(session)
    }

    /// 註冊新帳號；需要信箱確認時回傳 `None`
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>> {
        let auth = self.auth_service()?;
        let session = auth.sign_up(email, password).await?;
        match &session {
            Some(session) => {
                *self.session.lock().await = Some(session.clone());
                tracing::info!("🆕 Account created and signed in as {}", email);
            }
            None => tracing::info!("📧 Account created for {}, confirmation pending", email),
        }
        Ok(session)
    }

    pub async fn sign_out(&self) {
        let previous = self.session.lock().await.take();
        if let (Some(auth), Some(session)) = (&self.auth, previous) {
            if let Err(e) = auth.sign_out(&session.access_token).await {
                tracing::debug!("Remote sign out failed: {}", e);
            }
        }
    }

    fn auth_service(&self) -> Result<&SupabaseAuth> {
        self.auth.as_ref().ok_or_else(|| LucidlyError::MissingConfigError {
            field: "supabase_url".to_string(),
        })
    }

    /// 取得可用的 access token；過期時刷新，刷新失敗則登出
    async fn access_token(&self) -> Option<String> {
        let session = self.session.lock().await.clone()?;
        if !is_token_expired(&session.access_token) {
            return Some(session.access_token);
        }

        tracing::info!("🔄 Token expired, attempting refresh...");
        let refreshed = match (&self.auth, session.refresh_token.as_deref()) {
            (Some(auth), Some(refresh_token)) => auth.refresh_session(refresh_token).await,
            _ => Err(LucidlyError::unauthorized("No refresh token available")),
        };

        match refreshed {
            Ok(fresh) => {
                let token = fresh.access_token.clone();
                *self.session.lock().await = Some(fresh);
                Some(token)
            }
            Err(e) => {
                tracing::warn!("⚠️ Token refresh failed: {}", e);
                self.sign_out().await;
                None
            }
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, endpoint)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> ApiResponse<T> {
        let mut builder = self
            .http
            .request(method, self.url(endpoint))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.body(body.to_string());
        }
        self.send(builder).await
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResponse<T> {
        let builder = match self.access_token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return network_error(e),
        };

        let status = response.status();
        let body: Option<Value> = response.json().await.ok();

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                tracing::warn!("Authentication failed, clearing session");
                self.sign_out().await;
            }
            let error = body
                .as_ref()
                .and_then(|b| b.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| http_error(status));
            return ApiResponse::err(error);
        }

        match body.map(serde_json::from_value::<ApiResponse<T>>) {
            Some(Ok(envelope)) => envelope,
            Some(Err(e)) => ApiResponse::err(format!("Unexpected response: {}", e)),
            None => ApiResponse::err(http_error(status)),
        }
    }

    pub async fn get_dreams(&self) -> ApiResponse<Vec<Dream>> {
        self.request(Method::GET, "/dreams", None).await
    }

    pub async fn get_dream(&self, id: &str) -> ApiResponse<Dream> {
        self.request(Method::GET, &format!("/dreams/{}", id), None).await
    }

    pub async fn create_dream(&self, dream: &NewDream) -> ApiResponse<Dream> {
        match serde_json::to_value(dream) {
            Ok(body) => self.request(Method::POST, "/dreams", Some(body)).await,
            Err(e) => ApiResponse::err(e.to_string()),
        }
    }

    /// 要求伺服器產生 AI 分析欄位
    pub async fn update_dream(&self, id: &str, analysis: AnalysisRequest) -> ApiResponse<Dream> {
        match serde_json::to_value(analysis) {
            Ok(body) => {
                self.request(Method::PATCH, &format!("/dreams/{}", id), Some(body))
                    .await
            }
            Err(e) => ApiResponse::err(e.to_string()),
        }
    }

    pub async fn put_summary(&self, id: &str, summary: &str) -> ApiResponse<Dream> {
        self.request(
            Method::PUT,
            &format!("/dreams/{}", id),
            Some(json!({ "summary": summary })),
        )
        .await
    }

    pub async fn delete_dream(&self, id: &str) -> ApiResponse<Message> {
        self.request(Method::DELETE, &format!("/dreams/{}", id), None)
            .await
    }

    /// 以 multipart 上傳錄音（欄位 `file`，檔名 `recording.wav`）
    pub async fn transcribe_audio(&self, audio: Vec<u8>, mime_type: &str) -> ApiResponse<Transcript> {
        let part = match multipart::Part::bytes(audio)
            .file_name("recording.wav")
            .mime_str(mime_type)
        {
            Ok(part) => part,
            Err(e) => return ApiResponse::err(e.to_string()),
        };
        let form = multipart::Form::new().part("file", part);

        let builder = self.http.post(self.url("/transcribe")).multipart(form);
        self.send(builder).await
    }

    pub async fn summarize(&self, dream_id: &str, text: &str) -> ApiResponse<SummaryResult> {
        self.request(
            Method::POST,
            "/summary",
            Some(json!({ "dreamId": dream_id, "text": text })),
        )
        .await
    }

    pub async fn health(&self) -> ApiResponse<HealthStatus> {
        self.request(Method::GET, "/health", None).await
    }
}

fn http_error(status: StatusCode) -> String {
    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

fn network_error<T>(e: reqwest::Error) -> ApiResponse<T> {
    tracing::debug!("Request failed: {}", e);
    let message = e.to_string();
    if message.is_empty() {
        ApiResponse::err("Network error")
    } else {
        ApiResponse::err(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::jwt::unsigned_token;
    use crate::config::SupabaseSettings;
    use chrono::Utc;
    use httpmock::prelude::*;

    fn fresh_token(sub: &str) -> String {
        unsigned_token(&json!({ "sub": sub, "exp": Utc::now().timestamp() + 3600 }))
    }

    fn expired_token() -> String {
        unsigned_token(&json!({ "sub": "u1", "exp": Utc::now().timestamp() - 60 }))
    }

    fn session(access_token: String) -> Session {
        Session {
            access_token,
            refresh_token: Some("refresh-1".to_string()),
            user: None,
        }
    }

    fn dream_json(id: &str) -> Value {
        json!({
            "id": id,
            "user_id": "u1",
            "content": "Falling through clouds",
            "transcript": null,
            "summary": null,
            "sentiment": null,
            "interpretation": null,
            "created_at": "2024-05-01T06:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_sends_bearer_and_unwraps_envelope() {
        let server = MockServer::start();
        let token = fresh_token("u1");
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/dreams")
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json");
            then.status(200)
                .json_body(json!({ "success": true, "data": [dream_json("d1")] }));
        });

        let client = LucidlyClient::new(server.base_url())
            .unwrap()
            .with_session(session(token.clone()));
        let response = client.get_dreams().await;

        mock.assert();
        assert!(response.success);
        assert_eq!(response.data.unwrap()[0].id, "d1");
    }

    #[tokio::test]
    async fn test_error_envelope_and_http_fallback_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/dreams/missing");
            then.status(404)
                .json_body(json!({ "success": false, "error": "Dream not found" }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/dreams/broken");
            then.status(502).body("<html>bad gateway</html>");
        });

        let client = LucidlyClient::new(server.base_url()).unwrap();

        let response = client.get_dream("missing").await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Dream not found"));

        let response = client.get_dream("broken").await;
        assert_eq!(response.error.as_deref(), Some("HTTP 502: Bad Gateway"));
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/dreams");
            then.status(401)
                .json_body(json!({ "success": false, "error": "Invalid or expired token" }));
        });

        let client = LucidlyClient::new(server.base_url())
            .unwrap()
            .with_session(session(fresh_token("u1")));
        let response = client.get_dreams().await;

        assert_eq!(response.error.as_deref(), Some("Invalid or expired token"));
        assert!(client.session().await.is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let server = MockServer::start();
        let new_token = fresh_token("u1");
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "refresh_token")
                .json_body(json!({ "refresh_token": "refresh-1" }));
            then.status(200).json_body(json!({
                "access_token": new_token,
                "refresh_token": "refresh-2",
                "user": { "id": "u1", "email": "dreamer@example.com" }
            }));
        });
        let health = server.mock(|when, then| {
            when.method(GET)
                .path("/api/health")
                .header("authorization", format!("Bearer {}", new_token));
            then.status(200).json_body(json!({
                "success": true,
                "data": {
                    "status": "healthy",
                    "timestamp": "2024-05-01T06:00:00.000Z",
                    "environment": "test",
                    "version": "0.1.0"
                }
            }));
        });

        let auth = SupabaseAuth::new(SupabaseSettings {
            url: server.base_url(),
            api_key: "anon-key".to_string(),
        });
        let client = LucidlyClient::new(server.base_url())
            .unwrap()
            .with_auth(auth)
            .with_session(session(expired_token()));

        let response = client.health().await;

        refresh.assert();
        health.assert();
        assert_eq!(response.data.unwrap().status, "healthy");
        assert_eq!(
            client.session().await.and_then(|s| s.refresh_token),
            Some("refresh-2".to_string())
        );
    }

    #[tokio::test]
    async fn test_sign_up_stores_session_when_returned() {
        let server = MockServer::start();
        let token = fresh_token("u2");
        let signup = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/signup")
                .header("apikey", "anon-key")
                .json_body(json!({ "email": "new@example.com", "password": "s3cret" }));
            then.status(200).json_body(json!({
                "access_token": token,
                "refresh_token": "refresh-new",
                "user": { "id": "u2", "email": "new@example.com" }
            }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/signup")
                .json_body(json!({ "email": "pending@example.com", "password": "s3cret" }));
            then.status(200)
                .json_body(json!({ "id": "u3", "email": "pending@example.com" }));
        });

        let auth = SupabaseAuth::new(SupabaseSettings {
            url: server.base_url(),
            api_key: "anon-key".to_string(),
        });
        let client = LucidlyClient::new(server.base_url()).unwrap().with_auth(auth);

        let session = client.sign_up("new@example.com", "s3cret").await.unwrap();
        signup.assert();
        assert_eq!(session.unwrap().access_token, token);
        assert_eq!(
            client.session().await.and_then(|s| s.refresh_token),
            Some("refresh-new".to_string())
        );

        client.sign_out().await;
        let pending = client.sign_up("pending@example.com", "s3cret").await.unwrap();
        assert!(pending.is_none());
        assert!(client.session().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_up_requires_auth_settings() {
        let client = LucidlyClient::new("http://localhost:8080").unwrap();
        let err = client.sign_up("new@example.com", "s3cret").await.unwrap_err();
        assert!(matches!(err, LucidlyError::MissingConfigError { .. }));
    }

    #[tokio::test]
    async fn test_failed_refresh_signs_out_and_sends_no_token() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(400)
                .json_body(json!({ "error_description": "Invalid Refresh Token" }));
        });
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/logout");
            then.status(204);
        });
        let anonymous = server.mock(|when, then| {
            when.method(GET).path("/api/dreams");
            then.status(401)
                .json_body(json!({ "success": false, "error": "Missing or invalid authorization header" }));
        });

        let auth = SupabaseAuth::new(SupabaseSettings {
            url: server.base_url(),
            api_key: "anon-key".to_string(),
        });
        let client = LucidlyClient::new(server.base_url())
            .unwrap()
            .with_auth(auth)
            .with_session(session(expired_token()));

        let response = client.get_dreams().await;

        anonymous.assert();
        assert!(!response.success);
        assert!(client.session().await.is_none());
    }

    #[tokio::test]
    async fn test_transcribe_uploads_multipart_file() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/transcribe")
                .body_contains("name=\"file\"; filename=\"recording.wav\"");
            then.status(200)
                .json_body(json!({ "success": true, "data": { "transcript": "hello" } }));
        });

        let client = LucidlyClient::new(server.base_url()).unwrap();
        let response = client.transcribe_audio(b"RIFF....".to_vec(), "audio/wav").await;

        mock.assert();
        assert_eq!(response.data.unwrap().transcript, "hello");
    }

    #[tokio::test]
    async fn test_network_error_is_reported() {
        let client = LucidlyClient::new("http://127.0.0.1:1").unwrap();
        let response = client.health().await;
        assert!(!response.success);
        assert!(response.error.is_some());
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(LucidlyClient::new("not a url").is_err());
    }
}
