use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::models::recognition::{
    DocumentSide, FieldKey, OutcomeSource, ProviderResponse, RecognitionErrorKind,
    RecognitionOutcome,
};
use crate::services::credential::{AuthError, CredentialCache};

/// Confidence used for a front side when the provider reports no per-field scores.
pub const DEFAULT_FRONT_CONFIDENCE: f64 = 0.85;

/// The provider never names the holder on the back side.
pub const BACK_CONFIDENCE: f64 = 0.8;

/// Provider error codes meaning the access token is invalid or expired.
const TOKEN_ERROR_CODES: &[i64] = &[110, 111];

/// Message fragments that indicate a degraded network rather than a content problem.
const DEGRADED_MARKERS: &[&str] = &["timeout", "timed out", "network", "connect", "网络", "连接"];

/// Client for the provider's identity-card recognition endpoint.
pub struct RecognitionClient {
    http: Client,
    endpoint: String,
    credentials: Arc<CredentialCache>,
}

impl RecognitionClient {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: Arc<CredentialCache>,
        timeout: Duration,
    ) -> Result<Self, RecognitionError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecognitionError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            credentials,
        })
    }

    /// Recognize one side of an identity card.
    pub async fn recognize(
        &self,
        image_bytes: &[u8],
        side: DocumentSide,
    ) -> Result<RecognitionOutcome, RecognitionError> {
        let response = self.recognize_raw(image_bytes, side).await?;
        interpret(&response, side)
    }

    /// Send the image and return the provider's response without interpreting it.
    pub async fn recognize_raw(
        &self,
        image_bytes: &[u8],
        side: DocumentSide,
    ) -> Result<ProviderResponse, RecognitionError> {
        if image_bytes.is_empty() {
            return Err(RecognitionError::ProviderRejected("image is empty".to_string()));
        }

        let credential = self.credentials.get_credential().await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);

        debug!(side = %side, image_len = encoded.len(), "Submitting image for recognition");

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("access_token", credential.token.as_str())])
            .form(&[
                ("image", encoded.as_str()),
                ("id_card_side", side.as_str()),
                ("detect_direction", "true"),
                ("detect_risk", "false"),
            ])
            .send()
            .await
            .map_err(RecognitionError::from_transport)?;

        let status = response.status();
        if let Some(err) = RecognitionError::from_status(status) {
            return Err(err);
        }

        let body = response.text().await.map_err(RecognitionError::from_transport)?;
        let parsed: ProviderResponse = serde_json::from_str(&body)
            .map_err(|e| RecognitionError::MalformedResponse(e.to_string()))?;

        if let Some(code) = parsed.error_code {
            let message = parsed.error_msg.clone().unwrap_or_default();
            if TOKEN_ERROR_CODES.contains(&code) {
                self.credentials.invalidate();
                return Err(RecognitionError::Auth(AuthError::Provider(format!(
                    "[{}] {}",
                    code, message
                ))));
            }
            warn!(code, message = %message, "Provider rejected recognition request");
            return Err(RecognitionError::ProviderRejected(format!(
                "provider error [{}]: {}",
                code, message
            )));
        }

        if parsed.words_result.is_none() {
            return Err(RecognitionError::MalformedResponse(
                "response carries no words_result".to_string(),
            ));
        }

        info!(
            side = %side,
            fields = parsed.words_result_num.unwrap_or_default(),
            "Recognition response received"
        );

        Ok(parsed)
    }
}

/// Turn a provider response into an outcome for the requested side.
pub fn interpret(
    response: &ProviderResponse,
    side: DocumentSide,
) -> Result<RecognitionOutcome, RecognitionError> {
    if response.words_result.is_none() {
        return Err(RecognitionError::MalformedResponse(
            "response carries no words_result".to_string(),
        ));
    }

    match side {
        DocumentSide::Front => {
            let name = response.words(FieldKey::Name);
            if name.is_empty() {
                return Err(RecognitionError::NoNameExtracted);
            }

            let scores: Vec<f64> = [FieldKey::Name, FieldKey::IdNumber]
                .into_iter()
                .filter_map(|key| response.confidence(key))
                .filter(|score| *score > 0.0)
                .collect();
            let confidence = if scores.is_empty() {
                DEFAULT_FRONT_CONFIDENCE
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };

            Ok(RecognitionOutcome::recognized(
                name,
                response.words(FieldKey::IdNumber),
                confidence,
                OutcomeSource::Provider,
            ))
        }
        DocumentSide::Back => Ok(RecognitionOutcome::recognized(
            "",
            "",
            BACK_CONFIDENCE,
            OutcomeSource::Provider,
        )),
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RecognitionError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Provider rejected the request: {0}")]
    ProviderRejected(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("No name extracted from the front side")]
    NoNameExtracted,
}

impl RecognitionError {
    pub fn kind(&self) -> RecognitionErrorKind {
        match self {
            RecognitionError::Auth(_) => RecognitionErrorKind::Auth,
            RecognitionError::Network(_) => RecognitionErrorKind::Network,
            RecognitionError::ProviderRejected(_) => RecognitionErrorKind::ProviderRejected,
            RecognitionError::MalformedResponse(_) => RecognitionErrorKind::MalformedResponse,
            RecognitionError::NoNameExtracted => RecognitionErrorKind::NoNameExtracted,
        }
    }

    /// Whether the failure says "the call did not complete normally" rather
    /// than "this image was rejected". Environmental failures advance the
    /// fallback cascade.
    pub fn is_environmental(&self) -> bool {
        match self {
            RecognitionError::Auth(_) | RecognitionError::Network(_) => true,
            RecognitionError::ProviderRejected(message) => {
                let message = message.to_lowercase();
                DEGRADED_MARKERS.iter().any(|marker| message.contains(marker))
            }
            RecognitionError::MalformedResponse(_) | RecognitionError::NoNameExtracted => false,
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RecognitionError::Network(format!("request timed out: {}", err))
        } else {
            RecognitionError::Network(err.to_string())
        }
    }

    /// 404 and 5xx mean the service is unreachable; other non-2xx are rejections.
    pub(crate) fn from_status(status: StatusCode) -> Option<Self> {
        if status.is_success() {
            None
        } else if status == StatusCode::NOT_FOUND || status.is_server_error() {
            Some(RecognitionError::Network(format!("HTTP {}", status)))
        } else {
            Some(RecognitionError::ProviderRejected(format!("HTTP {}", status)))
        }
    }
}
