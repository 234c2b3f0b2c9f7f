pub mod document;
pub mod metrics;
pub mod ocr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::models::api::{ProxyErrorCode, ProxyResponse};
use crate::services::ocr::RecognitionError;
use crate::services::packager::PackagingError;
use crate::services::renderer::RenderError;

/// Recognition proxy, synthetic endpoint and document endpoints.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/ocr", post(ocr::proxy_recognition))
        .route("/api/mock-ocr", post(ocr::synthetic_recognition))
        .route("/api/v1/document", post(document::render_document))
        .route("/api/v1/batch", post(document::render_batch))
        .with_state(state)
}

/// Handler failure, rendered as `{success: false, error, code}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidImage(String),

    #[error("{0}")]
    InvalidSide(String),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Packaging(#[from] PackagingError),
}

impl ApiError {
    pub fn code(&self) -> ProxyErrorCode {
        match self {
            ApiError::InvalidImage(_) => ProxyErrorCode::InvalidImage,
            ApiError::InvalidSide(_) => ProxyErrorCode::InvalidSide,
            ApiError::Recognition(RecognitionError::Auth(_)) => ProxyErrorCode::TokenError,
            ApiError::Recognition(RecognitionError::Network(_)) => ProxyErrorCode::NetworkError,
            ApiError::Recognition(err @ RecognitionError::ProviderRejected(_)) => {
                if err.is_environmental() {
                    ProxyErrorCode::NetworkError
                } else {
                    ProxyErrorCode::ProviderError
                }
            }
            ApiError::Recognition(_) => ProxyErrorCode::UnknownError,
            ApiError::Render(RenderError::Interrupted(_)) => ProxyErrorCode::UnknownError,
            ApiError::Render(_) => ProxyErrorCode::InvalidImage,
            ApiError::Packaging(_) => ProxyErrorCode::UnknownError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match (self, self.code()) {
            (ApiError::Render(RenderError::TooLarge { .. }), _) => StatusCode::PAYLOAD_TOO_LARGE,
            (_, ProxyErrorCode::InvalidImage | ProxyErrorCode::InvalidSide) => StatusCode::BAD_REQUEST,
            (_, ProxyErrorCode::TokenError) => StatusCode::UNAUTHORIZED,
            (_, ProxyErrorCode::NetworkError) => StatusCode::SERVICE_UNAVAILABLE,
            (_, ProxyErrorCode::ProviderError) => StatusCode::UNPROCESSABLE_ENTITY,
            (_, ProxyErrorCode::UnknownError) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = %self.code(), "Request failed");
        } else {
            tracing::warn!(error = %self, code = %self.code(), "Request rejected");
        }

        let body = ProxyResponse::failure(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
