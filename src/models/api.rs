use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::batch::BatchResult;
use crate::models::recognition::{DocumentSide, ProviderResponse};

/// Request body of the recognition proxy (`POST /api/ocr`).
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ProxyRequest {
    /// Base64-encoded image, without a data-URL prefix.
    #[serde(default)]
    #[garde(length(min = 1))]
    pub image: String,

    /// "front" or "back"; validated separately so a bad value gets its own code.
    #[serde(default, alias = "id_card_side")]
    #[garde(skip)]
    pub side: String,
}

/// Response body shared by the proxy and the synthetic endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ProviderResponse>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// A `ProxyErrorCode` string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

impl ProxyResponse {
    pub fn ok(data: ProviderResponse, meta: ResponseMeta) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(meta),
            ..Self::default()
        }
    }

    pub fn failure(code: ProxyErrorCode, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            code: Some(code.to_string()),
            ..Self::default()
        }
    }

    pub fn error_code(&self) -> Option<ProxyErrorCode> {
        self.code.as_deref().and_then(|code| code.parse().ok())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub processing_ms: u64,

    #[serde(default)]
    pub synthetic: bool,
}

/// Failure classification carried in `ProxyResponse::code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProxyErrorCode {
    InvalidImage,
    InvalidSide,
    TokenError,
    NetworkError,
    ProviderError,
    UnknownError,
}

/// Request body of the synthetic endpoint (`POST /api/mock-ocr`).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticRequest {
    #[serde(alias = "id_card_side")]
    pub side: DocumentSide,

    #[serde(default, alias = "fileName")]
    pub file_name_hint: String,
}

/// Response of the batch endpoint (`POST /api/v1/batch`).
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub result: BatchResult,
    pub archive_name: String,
    /// Base64-encoded ZIP archive.
    pub archive: String,
}
