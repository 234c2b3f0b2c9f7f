use std::sync::Arc;

use crate::services::{
    fallback::FallbackCascade, ocr::RecognitionClient, packager::BatchPackager,
    renderer::DocumentRenderer,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Direct provider client behind the recognition proxy endpoint.
    pub recognizer: Arc<RecognitionClient>,
    pub cascade: Arc<FallbackCascade>,
    pub renderer: Arc<DocumentRenderer>,
    pub packager: Arc<BatchPackager>,
}

impl AppState {
    pub fn new(
        recognizer: Arc<RecognitionClient>,
        cascade: FallbackCascade,
        renderer: DocumentRenderer,
    ) -> Self {
        let renderer = Arc::new(renderer);
        Self {
            recognizer,
            cascade: Arc::new(cascade),
            packager: Arc::new(BatchPackager::new(Arc::clone(&renderer))),
            renderer,
        }
    }
}
