mod fixtures;
mod helpers;

use std::sync::Arc;

use serde_json::json;

use idcard_pdf::models::api::{ProxyErrorCode, ProxyResponse};
use idcard_pdf::models::recognition::{DocumentSide, OutcomeSource, RecognitionErrorKind};
use idcard_pdf::services::fallback::FallbackCascade;
use idcard_pdf::services::ocr::RecognitionError;
use idcard_pdf::services::proxy::ProxyClient;

use fixtures::{HOLDER_ID, HOLDER_NAME};
use helpers::{
    app_state_with, png_bytes, spawn_app, FakeProvider, RecognitionBehaviour, TokenBehaviour,
    TEST_TIMEOUT,
};

fn holder(scores: Option<(f64, f64)>) -> RecognitionBehaviour {
    RecognitionBehaviour::Front {
        name: HOLDER_NAME,
        id_number: HOLDER_ID,
        scores,
    }
}

#[tokio::test]
async fn test_front_recognized_with_bearer_token() {
    let provider = FakeProvider::answering(holder(Some((0.98, 0.9)))).await;
    let client = provider.recognizer();

    let outcome = client
        .recognize(&png_bytes(8, 5), DocumentSide::Front)
        .await
        .unwrap();

    assert!(outcome.succeeded);
    assert!(!outcome.is_synthetic);
    assert_eq!(outcome.source, OutcomeSource::Provider);
    assert_eq!(outcome.name, HOLDER_NAME);
    assert_eq!(outcome.id_number, HOLDER_ID);
    assert!((outcome.confidence - 0.94).abs() < 1e-9);

    assert_eq!(provider.last_token().as_deref(), Some("token-1"));
    assert_eq!(provider.last_side().as_deref(), Some("front"));
}

#[tokio::test]
async fn test_front_without_scores_uses_default_confidence() {
    let provider = FakeProvider::answering(holder(None)).await;
    let outcome = provider
        .recognizer()
        .recognize(&png_bytes(8, 5), DocumentSide::Front)
        .await
        .unwrap();
    assert_eq!(outcome.confidence, 0.85);
}

#[tokio::test]
async fn test_back_side_never_requires_a_name() {
    let provider = FakeProvider::answering(RecognitionBehaviour::Back).await;
    let outcome = provider
        .recognizer()
        .recognize(&png_bytes(8, 5), DocumentSide::Back)
        .await
        .unwrap();

    assert!(outcome.succeeded);
    assert!(outcome.name.is_empty());
    assert_eq!(provider.last_side().as_deref(), Some("back"));
}

#[tokio::test]
async fn test_front_without_name_is_no_name_extracted() {
    let provider = FakeProvider::answering(RecognitionBehaviour::Front {
        name: "",
        id_number: HOLDER_ID,
        scores: None,
    })
    .await;

    let err = provider
        .recognizer()
        .recognize(&png_bytes(8, 5), DocumentSide::Front)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RecognitionErrorKind::NoNameExtracted);
    assert!(!err.is_environmental());
}

#[tokio::test]
async fn test_server_error_is_network_failure() {
    let provider = FakeProvider::answering(RecognitionBehaviour::Status(503)).await;
    let err = provider
        .recognizer()
        .recognize(&png_bytes(8, 5), DocumentSide::Front)
        .await
        .unwrap_err();

    assert!(matches!(err, RecognitionError::Network(_)));
    assert!(err.is_environmental());
}

#[tokio::test]
async fn test_provider_error_code_is_rejection() {
    let provider =
        FakeProvider::answering(RecognitionBehaviour::ErrorCode(216201, "image format error"))
            .await;
    let err = provider
        .recognizer()
        .recognize(&png_bytes(8, 5), DocumentSide::Front)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RecognitionErrorKind::ProviderRejected);
    assert!(err.to_string().contains("216201"));
    assert!(!err.is_environmental());
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let provider = FakeProvider::answering(RecognitionBehaviour::Garbage).await;
    let err = provider
        .recognizer()
        .recognize(&png_bytes(8, 5), DocumentSide::Front)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RecognitionErrorKind::MalformedResponse);
}

#[tokio::test]
async fn test_expired_token_code_invalidates_cache() {
    let provider = FakeProvider::start(
        TokenBehaviour::Grant { expires_in: 2_592_000 },
        vec![
            RecognitionBehaviour::ErrorCode(110, "Access token invalid or no longer valid"),
            holder(None),
        ],
    )
    .await;
    let credentials = provider.credentials();
    let client = idcard_pdf::services::ocr::RecognitionClient::new(
        provider.recognition_url(),
        Arc::clone(&credentials),
        TEST_TIMEOUT,
    )
    .unwrap();

    let err = client
        .recognize(&png_bytes(8, 5), DocumentSide::Front)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RecognitionErrorKind::Auth);
    assert!(credentials.cached().is_none());

    let outcome = client
        .recognize(&png_bytes(8, 5), DocumentSide::Front)
        .await
        .unwrap();
    assert_eq!(outcome.name, HOLDER_NAME);
    assert_eq!(provider.token_calls(), 2);
    assert_eq!(provider.last_token().as_deref(), Some("token-2"));
}

#[tokio::test]
async fn test_proxy_client_matches_direct_client() {
    let provider = FakeProvider::answering(holder(Some((0.9, 0.9)))).await;
    let state = app_state_with(Arc::new(provider.recognizer()), FallbackCascade::local_only());
    let app = spawn_app(state).await;

    let proxy = ProxyClient::new(format!("{}/api/ocr", app), TEST_TIMEOUT).unwrap();
    let outcome = proxy
        .recognize(&png_bytes(8, 5), DocumentSide::Front)
        .await
        .unwrap();

    assert_eq!(outcome.name, HOLDER_NAME);
    assert_eq!(outcome.id_number, HOLDER_ID);
    assert!(!outcome.is_synthetic);
}

#[tokio::test]
async fn test_proxy_reports_upstream_outage_as_network() {
    let provider = FakeProvider::answering(RecognitionBehaviour::Status(502)).await;
    let state = app_state_with(Arc::new(provider.recognizer()), FallbackCascade::local_only());
    let app = spawn_app(state).await;

    let proxy = ProxyClient::new(format!("{}/api/ocr", app), TEST_TIMEOUT).unwrap();
    let err = proxy
        .recognize(&png_bytes(8, 5), DocumentSide::Front)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RecognitionErrorKind::Network);
}

#[tokio::test]
async fn test_proxy_rejects_bad_requests_with_codes() {
    let provider = FakeProvider::answering(holder(None)).await;
    let state = app_state_with(Arc::new(provider.recognizer()), FallbackCascade::local_only());
    let app = spawn_app(state).await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{}/api/ocr", app))
        .json(&json!({ "image": "", "side": "front" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: ProxyResponse = response.json().await.unwrap();
    assert!(!body.success);
    assert_eq!(body.error_code(), Some(ProxyErrorCode::InvalidImage));

    let response = http
        .post(format!("{}/api/ocr", app))
        .json(&json!({ "image": "aGk=", "id_card_side": "sideways" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: ProxyResponse = response.json().await.unwrap();
    assert_eq!(body.error_code(), Some(ProxyErrorCode::InvalidSide));

    assert_eq!(provider.recognition_calls(), 0);
}

#[tokio::test]
async fn test_synthetic_endpoint_serves_provider_shape() {
    let state = helpers::app_state(FallbackCascade::local_only()).await;
    let app = spawn_app(state).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/mock-ocr", app))
        .json(&json!({ "side": "front", "fileNameHint": "刘_front.jpg" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body: ProxyResponse = response.json().await.unwrap();
    assert!(body.success);
    assert!(body.meta.unwrap().synthetic);
    let data = body.data.unwrap();
    assert_eq!(
        data.words(idcard_pdf::models::recognition::FieldKey::Name),
        "刘七"
    );
}
