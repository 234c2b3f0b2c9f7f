use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use base64::Engine;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::api::{ProxyRequest, ProxyResponse, ResponseMeta, SyntheticRequest};
use crate::models::recognition::DocumentSide;
use crate::routes::ApiError;
use crate::services::synthetic::synthetic_provider_response;

/// POST /api/ocr — Recognize one side of an identity card on behalf of a client.
pub async fn proxy_recognition(
    State(state): State<AppState>,
    payload: Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<Json<ProxyResponse>, ApiError> {
    let started = Instant::now();

    let Json(request) =
        payload.map_err(|e| ApiError::InvalidImage(format!("invalid request body: {}", e)))?;

    request
        .validate()
        .map_err(|_| ApiError::InvalidImage("missing image data".to_string()))?;

    let side = parse_side(&request.side)?;
    let image = decode_image(&request.image)?;

    let data = state.recognizer.recognize_raw(&image, side).await?;

    Ok(Json(ProxyResponse::ok(
        data,
        ResponseMeta {
            processing_ms: started.elapsed().as_millis() as u64,
            synthetic: false,
        },
    )))
}

/// POST /api/mock-ocr — Synthetic recognition data in the provider's shape.
pub async fn synthetic_recognition(
    payload: Result<Json<SyntheticRequest>, JsonRejection>,
) -> Result<Json<ProxyResponse>, ApiError> {
    let started = Instant::now();

    let Json(request) =
        payload.map_err(|e| ApiError::InvalidSide(format!("invalid request body: {}", e)))?;

    tracing::info!(
        side = %request.side,
        hint = %request.file_name_hint,
        "Serving synthetic recognition data"
    );

    let data = synthetic_provider_response(request.side, &request.file_name_hint);

    Ok(Json(ProxyResponse::ok(
        data,
        ResponseMeta {
            processing_ms: started.elapsed().as_millis() as u64,
            synthetic: true,
        },
    )))
}

fn parse_side(raw: &str) -> Result<DocumentSide, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::InvalidSide(format!("side must be front or back, got {:?}", raw)))
}

/// Accepts bare base64 or a `data:` URL.
fn decode_image(encoded: &str) -> Result<Vec<u8>, ApiError> {
    let payload = match encoded.split_once("base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::InvalidImage(format!("image is not valid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(ApiError::InvalidImage("missing image data".to_string()));
    }
    Ok(bytes)
}
