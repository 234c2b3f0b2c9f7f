use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which face of the identity document an image shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentSide {
    Front,
    Back,
}

impl DocumentSide {
    /// Wire value sent to the provider as `id_card_side`.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentSide::Front => "front",
            DocumentSide::Back => "back",
        }
    }

    /// Field keys the provider returns for this side.
    pub fn expected_fields(self) -> &'static [FieldKey] {
        match self {
            DocumentSide::Front => &[
                FieldKey::Name,
                FieldKey::Ethnicity,
                FieldKey::Address,
                FieldKey::IdNumber,
                FieldKey::Birth,
                FieldKey::Sex,
            ],
            DocumentSide::Back => &[
                FieldKey::IssuingAuthority,
                FieldKey::IssueDate,
                FieldKey::ExpiryDate,
            ],
        }
    }
}

/// Fixed schema of provider field keys.
///
/// The provider keys its `words_result` map by printed label. Lookups go
/// through this enum so a missing label reads as an absent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Name,
    Ethnicity,
    Address,
    IdNumber,
    Birth,
    Sex,
    IssuingAuthority,
    IssueDate,
    ExpiryDate,
}

impl FieldKey {
    /// Label used by the provider for this field.
    pub fn provider_label(self) -> &'static str {
        match self {
            FieldKey::Name => "姓名",
            FieldKey::Ethnicity => "民族",
            FieldKey::Address => "住址",
            FieldKey::IdNumber => "公民身份号码",
            FieldKey::Birth => "出生",
            FieldKey::Sex => "性别",
            FieldKey::IssuingAuthority => "签发机关",
            FieldKey::IssueDate => "签发日期",
            FieldKey::ExpiryDate => "失效日期",
        }
    }
}

/// Raw recognition response, in the provider's shape.
///
/// Also the body of the synthetic endpoint and the `data` member of the
/// proxy response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words_result_num: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words_result: Option<BTreeMap<String, ProviderField>>,
}

impl ProviderResponse {
    /// Build a response carrying the given fields.
    pub fn with_fields(fields: Vec<(FieldKey, ProviderField)>) -> Self {
        let words_result: BTreeMap<String, ProviderField> = fields
            .into_iter()
            .map(|(key, field)| (key.provider_label().to_string(), field))
            .collect();

        Self {
            image_status: Some("normal".to_string()),
            words_result_num: Some(words_result.len() as u32),
            words_result: Some(words_result),
            ..Self::default()
        }
    }

    pub fn field(&self, key: FieldKey) -> Option<&ProviderField> {
        self.words_result
            .as_ref()
            .and_then(|fields| fields.get(key.provider_label()))
    }

    /// Recognized text for a field, empty when the field is absent.
    pub fn words(&self, key: FieldKey) -> &str {
        self.field(key).map(|f| f.words.trim()).unwrap_or("")
    }

    /// Per-field confidence, if the provider reported one.
    pub fn confidence(&self, key: FieldKey) -> Option<f64> {
        self.field(key)
            .and_then(|f| f.probability.as_ref())
            .map(|p| p.average)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderField {
    #[serde(default)]
    pub words: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<FieldLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<FieldProbability>,
}

impl ProviderField {
    pub fn text(words: impl Into<String>) -> Self {
        Self {
            words: words.into(),
            ..Self::default()
        }
    }

    pub fn located(words: impl Into<String>, left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            words: words.into(),
            location: Some(FieldLocation {
                left,
                top,
                width,
                height,
            }),
            probability: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldLocation {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldProbability {
    pub average: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub variance: f64,
}

/// Which strategy produced a recognition outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutcomeSource {
    Provider,
    RemoteSynthetic,
    LocalSynthetic,
}

impl OutcomeSource {
    pub fn is_synthetic(self) -> bool {
        !matches!(self, OutcomeSource::Provider)
    }
}

/// Classification of a recognition failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecognitionErrorKind {
    Auth,
    Network,
    ProviderRejected,
    MalformedResponse,
    NoNameExtracted,
}

/// Result of one recognition attempt. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    pub succeeded: bool,
    pub name: String,
    pub id_number: String,
    pub confidence: f64,
    pub is_synthetic: bool,
    pub source: OutcomeSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<RecognitionErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecognitionOutcome {
    /// A successful outcome attributed to `source`.
    pub fn recognized(
        name: impl Into<String>,
        id_number: impl Into<String>,
        confidence: f64,
        source: OutcomeSource,
    ) -> Self {
        Self {
            succeeded: true,
            name: name.into(),
            id_number: id_number.into(),
            confidence: confidence.clamp(0.0, 1.0),
            is_synthetic: source.is_synthetic(),
            source,
            error_kind: None,
            error: None,
        }
    }

    /// A failed provider outcome.
    pub fn failed(kind: RecognitionErrorKind, message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            name: String::new(),
            id_number: String::new(),
            confidence: 0.0,
            is_synthetic: false,
            source: OutcomeSource::Provider,
            error_kind: Some(kind),
            error: Some(message.into()),
        }
    }

    /// Re-attribute the outcome to the tier that actually returned it.
    pub fn attributed_to(self, source: OutcomeSource) -> Self {
        Self {
            is_synthetic: source.is_synthetic(),
            source,
            ..self
        }
    }
}
