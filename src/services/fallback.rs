use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::recognition::{DocumentSide, OutcomeSource, RecognitionOutcome};
use crate::services::ocr::{RecognitionClient, RecognitionError};
use crate::services::proxy::ProxyClient;
use crate::services::synthetic::{LocalSyntheticGenerator, RemoteSyntheticClient};

/// Input shared by every tier of the cascade.
#[derive(Debug, Clone, Copy)]
pub struct TierRequest<'a> {
    pub image: &'a [u8],
    pub side: DocumentSide,
    pub file_name_hint: &'a str,
}

/// One recognition strategy: return an outcome or a classified failure.
#[async_trait]
pub trait RecognitionTier: Send + Sync {
    fn source(&self) -> OutcomeSource;

    async fn attempt(&self, request: &TierRequest<'_>) -> Result<RecognitionOutcome, RecognitionError>;
}

#[async_trait]
impl RecognitionTier for RecognitionClient {
    fn source(&self) -> OutcomeSource {
        OutcomeSource::Provider
    }

    async fn attempt(&self, request: &TierRequest<'_>) -> Result<RecognitionOutcome, RecognitionError> {
        self.recognize(request.image, request.side).await
    }
}

#[async_trait]
impl RecognitionTier for ProxyClient {
    fn source(&self) -> OutcomeSource {
        OutcomeSource::Provider
    }

    async fn attempt(&self, request: &TierRequest<'_>) -> Result<RecognitionOutcome, RecognitionError> {
        self.recognize(request.image, request.side).await
    }
}

#[async_trait]
impl RecognitionTier for RemoteSyntheticClient {
    fn source(&self) -> OutcomeSource {
        OutcomeSource::RemoteSynthetic
    }

    async fn attempt(&self, request: &TierRequest<'_>) -> Result<RecognitionOutcome, RecognitionError> {
        self.recognize(request.side, request.file_name_hint).await
    }
}

/// Ordered recognition tiers ending in the infallible local generator.
///
/// The provider tier is left only on environmental failures; a synthetic
/// tier is left on any failure. A content failure from the provider ends
/// the cascade with an unsuccessful, non-synthetic outcome.
pub struct FallbackCascade {
    tiers: Vec<Arc<dyn RecognitionTier>>,
    terminal: LocalSyntheticGenerator,
}

impl FallbackCascade {
    pub fn new(tiers: Vec<Arc<dyn RecognitionTier>>) -> Self {
        Self {
            tiers,
            terminal: LocalSyntheticGenerator,
        }
    }

    /// A cascade with only the local generator.
    pub fn local_only() -> Self {
        Self::new(Vec::new())
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len() + 1
    }

    /// Recognize with fallback. Never fails.
    pub async fn recognize_with_fallback(
        &self,
        image: &[u8],
        side: DocumentSide,
        file_name_hint: &str,
    ) -> RecognitionOutcome {
        let request = TierRequest {
            image,
            side,
            file_name_hint,
        };

        for (index, tier) in self.tiers.iter().enumerate() {
            let source = tier.source();
            match tier.attempt(&request).await {
                Ok(outcome) => {
                    metrics::counter!("recognition_tier_total", "tier" => source.to_string())
                        .increment(1);
                    info!(tier = index + 1, source = %source, side = %side, "Recognition tier succeeded");
                    return outcome.attributed_to(source);
                }
                Err(err) if source.is_synthetic() || err.is_environmental() => {
                    metrics::counter!("recognition_fallback_total", "from" => source.to_string())
                        .increment(1);
                    warn!(
                        tier = index + 1,
                        source = %source,
                        error = %err,
                        "Recognition tier unavailable, falling back"
                    );
                }
                Err(err) => {
                    warn!(
                        tier = index + 1,
                        source = %source,
                        kind = %err.kind(),
                        error = %err,
                        "Recognition failed for a non-environmental reason"
                    );
                    return RecognitionOutcome::failed(err.kind(), err.to_string());
                }
            }
        }

        let source = OutcomeSource::LocalSynthetic;
        metrics::counter!("recognition_tier_total", "tier" => source.to_string()).increment(1);
        self.terminal.generate(side, file_name_hint)
    }
}
