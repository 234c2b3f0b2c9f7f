//! Test helper utilities: a fake recognition provider and an in-process app server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::json;

use idcard_pdf::app_state::AppState;
use idcard_pdf::models::layout::PageConfig;
use idcard_pdf::services::credential::{CredentialCache, HttpTokenProvider};
use idcard_pdf::services::fallback::FallbackCascade;
use idcard_pdf::services::ocr::RecognitionClient;
use idcard_pdf::services::renderer::DocumentRenderer;

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// How the fake token endpoint answers.
#[derive(Debug, Clone)]
pub enum TokenBehaviour {
    Grant { expires_in: i64 },
    Rejected,
    EmptyToken,
    Slow(Duration),
}

/// How the fake recognition endpoint answers one request.
#[derive(Debug, Clone)]
pub enum RecognitionBehaviour {
    Front {
        name: &'static str,
        id_number: &'static str,
        scores: Option<(f64, f64)>,
    },
    Back,
    ErrorCode(i64, &'static str),
    Status(u16),
    Garbage,
    /// Answers with a valid front response after the delay.
    Slow(Duration),
}

#[derive(Default)]
struct ProviderState {
    token: Option<TokenBehaviour>,
    script: Vec<RecognitionBehaviour>,
    token_calls: AtomicUsize,
    recognition_calls: AtomicUsize,
    last_token: Mutex<Option<String>>,
    last_side: Mutex<Option<String>>,
}

/// Recognition provider stand-in listening on an ephemeral local port.
#[derive(Clone)]
pub struct FakeProvider {
    pub base_url: String,
    state: Arc<ProviderState>,
}

impl FakeProvider {
    /// Start a provider whose recognition endpoint plays `script` in order,
    /// repeating the last entry once exhausted.
    pub async fn start(token: TokenBehaviour, script: Vec<RecognitionBehaviour>) -> Self {
        let state = Arc::new(ProviderState {
            token: Some(token),
            script,
            ..ProviderState::default()
        });

        let app = Router::new()
            .route("/oauth/2.0/token", post(token_handler))
            .route("/rest/2.0/ocr/v1/idcard", post(recognition_handler))
            .with_state(Arc::clone(&state));

        let base_url = serve(app).await;
        Self { base_url, state }
    }

    /// A provider granting long-lived tokens and answering every call with `behaviour`.
    pub async fn answering(behaviour: RecognitionBehaviour) -> Self {
        Self::start(TokenBehaviour::Grant { expires_in: 2_592_000 }, vec![behaviour]).await
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/2.0/token", self.base_url)
    }

    pub fn recognition_url(&self) -> String {
        format!("{}/rest/2.0/ocr/v1/idcard", self.base_url)
    }

    pub fn token_calls(&self) -> usize {
        self.state.token_calls.load(Ordering::SeqCst)
    }

    pub fn recognition_calls(&self) -> usize {
        self.state.recognition_calls.load(Ordering::SeqCst)
    }

    pub fn last_token(&self) -> Option<String> {
        self.state.last_token.lock().unwrap().clone()
    }

    pub fn last_side(&self) -> Option<String> {
        self.state.last_side.lock().unwrap().clone()
    }

    pub fn credentials(&self) -> Arc<CredentialCache> {
        credentials_for(&self.token_url())
    }

    pub fn recognizer(&self) -> RecognitionClient {
        RecognitionClient::new(self.recognition_url(), self.credentials(), TEST_TIMEOUT).unwrap()
    }
}

async fn token_handler(State(state): State<Arc<ProviderState>>) -> Response {
    let n = state.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    match state.token.clone().unwrap_or(TokenBehaviour::Rejected) {
        TokenBehaviour::Grant { expires_in } => Json(json!({
            "access_token": format!("token-{}", n),
            "expires_in": expires_in,
        }))
        .into_response(),
        TokenBehaviour::Rejected => Json(json!({
            "error": "invalid_client",
            "error_description": "unknown client id",
        }))
        .into_response(),
        TokenBehaviour::EmptyToken => {
            Json(json!({ "access_token": "", "expires_in": 3600 })).into_response()
        }
        TokenBehaviour::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({ "access_token": "late", "expires_in": 3600 })).into_response()
        }
    }
}

async fn recognition_handler(
    State(state): State<Arc<ProviderState>>,
    Query(query): Query<HashMap<String, String>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = state.recognition_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_token.lock().unwrap() = query.get("access_token").cloned();
    *state.last_side.lock().unwrap() = form.get("id_card_side").cloned();

    let behaviour = state
        .script
        .get(n)
        .or_else(|| state.script.last())
        .cloned()
        .unwrap_or(RecognitionBehaviour::Status(500));

    match behaviour {
        RecognitionBehaviour::Front {
            name,
            id_number,
            scores,
        } => {
            let probability = |score: Option<f64>| {
                score.map(|average| json!({ "average": average, "min": average, "variance": 0.0 }))
            };
            Json(json!({
                "log_id": 1,
                "words_result_num": 2,
                "words_result": {
                    "姓名": { "words": name, "probability": probability(scores.map(|s| s.0)) },
                    "公民身份号码": { "words": id_number, "probability": probability(scores.map(|s| s.1)) },
                }
            }))
            .into_response()
        }
        RecognitionBehaviour::Back => Json(json!({
            "log_id": 2,
            "words_result_num": 3,
            "words_result": {
                "签发机关": { "words": "北京市公安局" },
                "签发日期": { "words": "20150101" },
                "失效日期": { "words": "20350101" },
            }
        }))
        .into_response(),
        RecognitionBehaviour::ErrorCode(code, message) => {
            Json(json!({ "error_code": code, "error_msg": message })).into_response()
        }
        RecognitionBehaviour::Status(status) => (
            StatusCode::from_u16(status).unwrap(),
            "upstream unavailable",
        )
            .into_response(),
        RecognitionBehaviour::Garbage => "<html>not json</html>".into_response(),
        RecognitionBehaviour::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({
                "log_id": 3,
                "words_result_num": 1,
                "words_result": { "姓名": { "words": "迟到" } }
            }))
            .into_response()
        }
    }
}

/// Serve `app` on 127.0.0.1 and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Serve the application router with `state` and return its base URL.
pub async fn spawn_app(state: AppState) -> String {
    let app = idcard_pdf::routes::api_router(state).layer(DefaultBodyLimit::max(64 * 1024 * 1024));
    serve(app).await
}

/// URL of a local port with nothing listening on it.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn credentials_for(token_url: &str) -> Arc<CredentialCache> {
    let provider = HttpTokenProvider::new(token_url, "test-id", "test-secret", TEST_TIMEOUT).unwrap();
    Arc::new(CredentialCache::new(Arc::new(provider), Duration::from_secs(300)))
}

/// A recognition client whose provider is unreachable.
pub async fn unreachable_recognizer() -> RecognitionClient {
    let base = closed_port_url().await;
    RecognitionClient::new(
        format!("{}/rest/2.0/ocr/v1/idcard", base),
        credentials_for(&format!("{}/oauth/2.0/token", base)),
        TEST_TIMEOUT,
    )
    .unwrap()
}

/// Application state with the given cascade and an unreachable direct client.
pub async fn app_state(cascade: FallbackCascade) -> AppState {
    app_state_with(Arc::new(unreachable_recognizer().await), cascade)
}

pub fn app_state_with(recognizer: Arc<RecognitionClient>, cascade: FallbackCascade) -> AppState {
    AppState::new(
        recognizer,
        cascade,
        DocumentRenderer::new(PageConfig::default(), 10 * 1024 * 1024),
    )
}

/// Solid-colour PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([90, 140, 210]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}
