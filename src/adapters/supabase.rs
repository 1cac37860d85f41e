use crate::config::SupabaseSettings;
use crate::domain::model::{AuthUser, Dream, DreamPatch, NewDream, Session};
use crate::domain::ports::{AuthProvider, DreamStore};
use crate::utils::error::{LucidlyError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

const DREAMS_TABLE: &str = "dreams";

/// Supabase 專案的共用連線資訊
#[derive(Debug, Clone)]
struct SupabaseHttp {
    client: Client,
    settings: SupabaseSettings,
}

impl SupabaseHttp {
    fn new(settings: SupabaseSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.url.trim_end_matches('/'), path)
    }

    /// 加上 `apikey` 與使用者的 bearer token
    fn authorized(&self, builder: RequestBuilder, access_token: &str) -> RequestBuilder {
        builder
            .header("apikey", &self.settings.api_key)
            .bearer_auth(access_token)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!("Supabase error {}: {}", status, body);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(LucidlyError::unauthorized("Invalid or expired token"))
            }
            _ => Err(LucidlyError::upstream(
                "supabase",
                status.as_u16(),
                error_message(&body),
            )),
        }
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}

/// 從 PostgREST / GoTrue 的錯誤回應中取出訊息
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

fn single_row(mut rows: Vec<Dream>, id: &str) -> Result<Dream> {
    if rows.is_empty() {
        return Err(LucidlyError::not_found(format!("Dream {} not found", id)));
    }
    Ok(rows.swap_remove(0))
}

/// 透過 PostgREST 存取 `dreams` 資料表
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    http: SupabaseHttp,
}

impl SupabaseStore {
    pub fn new(settings: SupabaseSettings) -> Self {
        Self {
            http: SupabaseHttp::new(settings),
        }
    }

    fn table_url(&self) -> String {
        self.http.url(&format!("/rest/v1/{}", DREAMS_TABLE))
    }
}

#[async_trait]
impl DreamStore for SupabaseStore {
    async fn list_for_user(&self, access_token: &str, user_id: &str) -> Result<Vec<Dream>> {
        let user_filter = format!("eq.{}", user_id);
        let request = self.http.client.get(self.table_url()).query(&[
            ("select", "*"),
            ("user_id", user_filter.as_str()),
            ("order", "created_at.desc"),
        ]);

        let response = self.http.authorized(request, access_token).send().await?;
        SupabaseHttp::json(response).await
    }

    async fn get(&self, access_token: &str, id: &str) -> Result<Dream> {
        let id_filter = format!("eq.{}", id);
        let request = self
            .http
            .client
            .get(self.table_url())
            .query(&[("select", "*"), ("id", id_filter.as_str())]);

        let response = self.http.authorized(request, access_token).send().await?;
        single_row(SupabaseHttp::json(response).await?, id)
    }

    async fn insert(&self, access_token: &str, user_id: &str, dream: &NewDream) -> Result<Dream> {
        let body = json!({
            "content": dream.content.clone().unwrap_or_default(),
            "transcript": dream.transcript.clone().filter(|t| !t.is_empty()),
            "user_id": user_id,
        });

        let request = self
            .http
            .client
            .post(self.table_url())
            .header("Prefer", "return=representation")
            .json(&body);

        let response = self.http.authorized(request, access_token).send().await?;
        let rows: Vec<Dream> = SupabaseHttp::json(response).await?;
        rows.into_iter().next().ok_or_else(|| {
            LucidlyError::upstream("supabase", 500, "insert returned no representation")
        })
    }

    async fn update(&self, access_token: &str, id: &str, patch: &DreamPatch) -> Result<Dream> {
        let id_filter = format!("eq.{}", id);
        let request = self
            .http
            .client
            .patch(self.table_url())
            .query(&[("id", id_filter.as_str())])
            .header("Prefer", "return=representation")
            .json(patch);

        let response = self.http.authorized(request, access_token).send().await?;
        single_row(SupabaseHttp::json(response).await?, id)
    }

    async fn delete(&self, access_token: &str, id: &str) -> Result<()> {
        let id_filter = format!("eq.{}", id);
        let request = self
            .http
            .client
            .delete(self.table_url())
            .query(&[("id", id_filter.as_str())]);

        let response = self.http.authorized(request, access_token).send().await?;
        SupabaseHttp::check(response).await?;
        Ok(())
    }
}

/// Supabase Auth (GoTrue) 客戶端
#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    http: SupabaseHttp,
}

impl SupabaseAuth {
    pub fn new(settings: SupabaseSettings) -> Self {
        Self {
            http: SupabaseHttp::new(settings),
        }
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session> {
        let response = self
            .http
            .client
            .post(self.http.url("/auth/v1/token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.http.settings.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(LucidlyError::unauthorized(error_message(&body)));
        }
        SupabaseHttp::json(response).await
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        tracing::debug!("🔑 Signing in as {}", email);
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        tracing::debug!("🔄 Refreshing session");
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    /// 註冊；若專案需要信箱驗證則不會立即取得 session
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>> {
        let response = self
            .http
            .client
            .post(self.http.url("/auth/v1/signup"))
            .header("apikey", &self.http.settings.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let value: Value = SupabaseHttp::json(response).await?;
        if value.get("access_token").is_some() {
            Ok(Some(serde_json::from_value(value)?))
        } else {
            Ok(None)
        }
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let request = self.http.client.post(self.http.url("/auth/v1/logout"));
        let response = self.http.authorized(request, access_token).send().await?;
        SupabaseHttp::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn verify(&self, access_token: &str) -> Result<AuthUser> {
        if access_token.is_empty() {
            return Err(LucidlyError::unauthorized("Missing access token"));
        }
        let request = self.http.client.get(self.http.url("/auth/v1/user"));
        let response = self.http.authorized(request, access_token).send().await?;
        SupabaseHttp::json(response).await
    }
}
