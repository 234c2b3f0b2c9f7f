use std::time::Duration;

use base64::Engine;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::models::api::{ProxyErrorCode, ProxyRequest, ProxyResponse};
use crate::models::recognition::{DocumentSide, RecognitionOutcome};
use crate::services::credential::AuthError;
use crate::services::ocr::{self, RecognitionError};

/// Reaches the recognition provider through the proxy boundary over HTTP.
///
/// Failures are classified the same way as the in-process client so the
/// cascade cannot tell the two apart.
pub struct ProxyClient {
    http: Client,
    endpoint: String,
}

impl ProxyClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RecognitionError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecognitionError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub async fn recognize(
        &self,
        image_bytes: &[u8],
        side: DocumentSide,
    ) -> Result<RecognitionOutcome, RecognitionError> {
        let request = ProxyRequest {
            image: base64::engine::general_purpose::STANDARD.encode(image_bytes),
            side: side.to_string(),
        };

        debug!(endpoint = %self.endpoint, side = %side, "Submitting image through proxy");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(RecognitionError::from_transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status.is_server_error() {
            return Err(RecognitionError::Network(format!("proxy returned HTTP {}", status)));
        }

        let body: ProxyResponse = match response.json().await {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(RecognitionError::MalformedResponse(e.to_string()))
            }
            Err(_) => {
                return Err(RecognitionError::ProviderRejected(format!(
                    "proxy returned HTTP {}",
                    status
                )))
            }
        };

        if !body.success {
            return Err(classify_failure(&body));
        }

        let data = body.data.ok_or_else(|| {
            RecognitionError::MalformedResponse("proxy reported success without data".to_string())
        })?;

        ocr::interpret(&data, side)
    }
}

/// Map a proxy failure body back onto the recognition error taxonomy.
fn classify_failure(body: &ProxyResponse) -> RecognitionError {
    let message = body
        .error
        .clone()
        .unwrap_or_else(|| "recognition failed".to_string());

    match body.error_code() {
        Some(ProxyErrorCode::NetworkError) => RecognitionError::Network(message),
        Some(ProxyErrorCode::TokenError) => RecognitionError::Auth(AuthError::Provider(message)),
        _ => RecognitionError::ProviderRejected(message),
    }
}
