use std::time::Duration;

use reqwest::Client;
use tracing::warn;

use crate::models::api::{ProxyResponse, SyntheticRequest};
use crate::models::recognition::{
    DocumentSide, FieldKey, OutcomeSource, ProviderField, ProviderResponse, RecognitionOutcome,
};
use crate::services::ocr::RecognitionError;

/// ID number carried by every synthetic front-side outcome.
pub const PLACEHOLDER_ID_NUMBER: &str = "110101199001011234";

/// Name used when a synthetic front response has no name field.
pub const REMOTE_PLACEHOLDER_NAME: &str = "模拟姓名";

pub const REMOTE_SYNTHETIC_CONFIDENCE: f64 = 0.85;
pub const LOCAL_SYNTHETIC_CONFIDENCE: f64 = 0.80;

/// Placeholder names selected by a character of the file name hint.
const LOCAL_NAMES: &[(char, &str)] = &[('张', "张三"), ('李', "李四"), ('王', "王五")];
const LOCAL_DEFAULT_NAME: &str = "测试用户";

const ENDPOINT_NAMES: &[(char, &str)] = &[
    ('李', "李四"),
    ('王', "王五"),
    ('陈', "陈六"),
    ('刘', "刘七"),
];
const ENDPOINT_DEFAULT_NAME: &str = "张三";

/// Last-resort recognition: a placeholder derived from the file name alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSyntheticGenerator;

impl LocalSyntheticGenerator {
    pub fn generate(&self, side: DocumentSide, file_name_hint: &str) -> RecognitionOutcome {
        match side {
            DocumentSide::Front => {
                let name = local_placeholder_name(file_name_hint);
                warn!(name, hint = file_name_hint, "Using local synthetic recognition data");
                RecognitionOutcome::recognized(
                    name,
                    PLACEHOLDER_ID_NUMBER,
                    LOCAL_SYNTHETIC_CONFIDENCE,
                    OutcomeSource::LocalSynthetic,
                )
            }
            DocumentSide::Back => RecognitionOutcome::recognized(
                "",
                "",
                LOCAL_SYNTHETIC_CONFIDENCE,
                OutcomeSource::LocalSynthetic,
            ),
        }
    }
}

fn local_placeholder_name(file_name_hint: &str) -> &'static str {
    let stem = strip_extension(file_name_hint);
    LOCAL_NAMES
        .iter()
        .find(|(marker, _)| stem.contains(*marker))
        .map(|(_, name)| *name)
        .unwrap_or(LOCAL_DEFAULT_NAME)
}

fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    }
}

/// Body served by the synthetic endpoint, in the provider's response shape.
pub fn synthetic_provider_response(side: DocumentSide, file_name_hint: &str) -> ProviderResponse {
    match side {
        DocumentSide::Front => {
            let name = ENDPOINT_NAMES
                .iter()
                .find(|(marker, _)| file_name_hint.contains(*marker))
                .map(|(_, name)| *name)
                .unwrap_or(ENDPOINT_DEFAULT_NAME);

            ProviderResponse::with_fields(vec![
                (FieldKey::Name, ProviderField::located(name, 142, 72, 94, 32)),
                (FieldKey::Ethnicity, ProviderField::located("汉", 142, 114, 30, 32)),
                (
                    FieldKey::Address,
                    ProviderField::located("北京市朝阳区某某街道123号", 142, 156, 224, 84),
                ),
                (
                    FieldKey::IdNumber,
                    ProviderField::located(PLACEHOLDER_ID_NUMBER, 197, 270, 169, 32),
                ),
                (FieldKey::Birth, ProviderField::located("19900101", 142, 198, 94, 32)),
                (FieldKey::Sex, ProviderField::located("男", 256, 114, 30, 32)),
            ])
        }
        DocumentSide::Back => ProviderResponse::with_fields(vec![
            (
                FieldKey::IssuingAuthority,
                ProviderField::located("北京市公安局朝阳分局", 125, 101, 155, 32),
            ),
            (FieldKey::IssueDate, ProviderField::located("20100101", 125, 143, 94, 32)),
            (FieldKey::ExpiryDate, ProviderField::located("20300101", 234, 143, 94, 32)),
        ]),
    }
}

/// Client for a remote synthetic-data endpoint.
pub struct RemoteSyntheticClient {
    http: Client,
    endpoint: String,
}

impl RemoteSyntheticClient {
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
        side: DocumentSide,
        file_name_hint: &str,
    ) -> Result<RecognitionOutcome, RecognitionError> {
        let request = SyntheticRequest {
            side,
            file_name_hint: file_name_hint.to_string(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(RecognitionError::from_transport)?;

        if let Some(err) = RecognitionError::from_status(response.status()) {
            return Err(err);
        }

        let body: ProxyResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::MalformedResponse(e.to_string()))?;

        let data = match body.data {
            Some(data) if body.success && data.words_result.is_some() => data,
            _ => {
                return Err(RecognitionError::MalformedResponse(
                    body.error
                        .unwrap_or_else(|| "synthetic endpoint returned no data".to_string()),
                ))
            }
        };

        Ok(match side {
            DocumentSide::Front => {
                let name = non_empty_or(data.words(FieldKey::Name), REMOTE_PLACEHOLDER_NAME);
                let id_number = non_empty_or(data.words(FieldKey::IdNumber), PLACEHOLDER_ID_NUMBER);
                RecognitionOutcome::recognized(
                    name,
                    id_number,
                    REMOTE_SYNTHETIC_CONFIDENCE,
                    OutcomeSource::RemoteSynthetic,
                )
            }
            DocumentSide::Back => RecognitionOutcome::recognized(
                "",
                "",
                REMOTE_SYNTHETIC_CONFIDENCE,
                OutcomeSource::RemoteSynthetic,
            ),
        })
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_follows_hint() {
        let generator = LocalSyntheticGenerator;
        assert_eq!(generator.generate(DocumentSide::Front, "张_front.jpg").name, "张三");
        assert_eq!(generator.generate(DocumentSide::Front, "scan_李.png").name, "李四");
        assert_eq!(generator.generate(DocumentSide::Front, "王.jpeg").name, "王五");
        assert_eq!(generator.generate(DocumentSide::Front, "IMG_0001.jpg").name, "测试用户");
    }

    #[test]
    fn test_local_outcome_is_synthetic() {
        let outcome = LocalSyntheticGenerator.generate(DocumentSide::Front, "");
        assert!(outcome.succeeded);
        assert!(outcome.is_synthetic);
        assert_eq!(outcome.source, OutcomeSource::LocalSynthetic);
        assert_eq!(outcome.id_number, PLACEHOLDER_ID_NUMBER);
        assert_eq!(outcome.confidence, LOCAL_SYNTHETIC_CONFIDENCE);
    }

    #[test]
    fn test_local_back_has_no_identity() {
        let outcome = LocalSyntheticGenerator.generate(DocumentSide::Back, "张.jpg");
        assert!(outcome.is_synthetic);
        assert!(outcome.name.is_empty());
        assert!(outcome.id_number.is_empty());
    }

    #[test]
    fn test_extension_only_stripped_after_stem() {
        assert_eq!(strip_extension(".hidden"), ".hidden");
        assert_eq!(strip_extension("a.b.jpg"), "a.b");
        assert_eq!(strip_extension("noext"), "noext");
    }

    #[test]
    fn test_endpoint_response_mirrors_provider_shape() {
        let front = synthetic_provider_response(DocumentSide::Front, "陈_1.jpg");
        assert_eq!(front.words(FieldKey::Name), "陈六");
        assert_eq!(front.words(FieldKey::IdNumber), PLACEHOLDER_ID_NUMBER);
        assert_eq!(front.words_result_num, Some(6));

        let default = synthetic_provider_response(DocumentSide::Front, "scan.jpg");
        assert_eq!(default.words(FieldKey::Name), "张三");

        let back = synthetic_provider_response(DocumentSide::Back, "");
        assert_eq!(back.words(FieldKey::Name), "");
        assert_eq!(back.words(FieldKey::IssuingAuthority), "北京市公安局朝阳分局");
        for key in DocumentSide::Back.expected_fields() {
            assert!(back.field(*key).is_some());
        }
    }
}
