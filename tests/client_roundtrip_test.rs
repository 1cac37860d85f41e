use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use httpmock::prelude::*;
use lucidly::config::{InferenceSettings, ServerSettings, StoreBackend, DEFAULT_MAX_UPLOAD_BYTES};
use lucidly::domain::model::{AnalysisRequest, DreamView, Mood, NewDream, Session};
use lucidly::server::{create_router, AppState};
use lucidly::LucidlyClient;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

/// 開發模式的 token 也要是 JWT，客戶端才不會把它當成過期
fn dev_token(sub: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    format!(
        "{}.{}.dev",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#),
        URL_SAFE_NO_PAD.encode(json!({ "sub": sub, "exp": exp }).to_string())
    )
}

async fn spawn_server(hf: &MockServer, token: &str) -> String {
    let settings = ServerSettings {
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        store: StoreBackend::Memory {
            tokens: HashMap::from([(token.to_string(), "dreamer".to_string())]),
        },
        inference: InferenceSettings {
            base_url: hf.base_url(),
            api_key: Some("hf_test".to_string()),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        },
        transcribe_timeout: Duration::from_secs(5),
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
    };

    let app = create_router(AppState::from_settings(&settings).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_client_round_trip() {
    let hf = MockServer::start();
    hf.mock(|when, then| {
        when.method(POST)
            .path("/cardiffnlp/twitter-roberta-base-sentiment-latest");
        then.status(200)
            .json_body(json!([{ "label": "positive", "score": 0.95 }]));
    });
    hf.mock(|when, then| {
        when.method(POST).path("/openai/whisper-large-v3-turbo");
        then.status(200).json_body(json!({ "text": "a quiet garden" }));
    });

    let token = dev_token("dreamer");
    let base_url = spawn_server(&hf, &token).await;
    let client = LucidlyClient::new(base_url).unwrap().with_session(Session {
        access_token: token,
        refresh_token: None,
        user: None,
    });

    let health = client.health().await;
    assert!(health.success);

    let created = client
        .create_dream(&NewDream {
            content: Some("I found a garden behind the wall. Everything was calm.".to_string()),
            transcript: None,
        })
        .await;
    assert!(created.success, "{:?}", created.error);
    let id = created.data.unwrap().id;

    let analyzed = client
        .update_dream(
            &id,
            AnalysisRequest {
                generate_sentiment: true,
                ..Default::default()
            },
        )
        .await;
    let view = DreamView::from(analyzed.data.unwrap());
    assert_eq!(view.title, "I found a garden behind the wall");
    assert_eq!(view.mood, Mood::Lucid);

    let listed = client.get_dreams().await.data.unwrap();
    assert_eq!(listed.len(), 1);

    let transcript = client.transcribe_audio(b"RIFF".to_vec(), "audio/wav").await;
    assert_eq!(transcript.data.unwrap().transcript, "a quiet garden");

    let missing = client.get_dream("does-not-exist").await;
    assert!(!missing.success);
    assert_eq!(missing.error.as_deref(), Some("Dream not found"));

    let deleted = client.delete_dream(&id).await;
    assert_eq!(deleted.data.unwrap().message, "Dream deleted successfully");
}

#[tokio::test]
async fn test_client_without_session_is_rejected() {
    let hf = MockServer::start();
    let base_url = spawn_server(&hf, &dev_token("dreamer")).await;
    let client = LucidlyClient::new(base_url).unwrap();

    let response = client.get_dreams().await;
    assert!(!response.success);
    assert_eq!(
        response.error.as_deref(),
        Some("Missing or invalid authorization header")
    );
}
