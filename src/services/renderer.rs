//! Document renderer: draws a front/back image pair onto one PDF page using
//! `printpdf` 0.8.
//!
//! printpdf places XObjects from the bottom-left corner in points, while the
//! layout engine works top-down in millimetres, so placements are flipped and
//! converted here.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use crate::models::layout::{ImageDescriptor, LayoutError, PageConfig, PageLayout, Placement};
use crate::services::layout::compute_layout;

/// Resolution images are embedded at before scaling to their placement.
const EMBED_DPI: f32 = 300.0;

/// Renders identity document pairs into single-page PDFs.
#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    page: PageConfig,
    max_image_bytes: usize,
    title: String,
}

impl DocumentRenderer {
    pub fn new(page: PageConfig, max_image_bytes: usize) -> Self {
        Self {
            page,
            max_image_bytes,
            title: "Identity Document".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Decode both images, lay them out and encode a one-page PDF.
    #[instrument(skip(self, front, back), fields(front_len = front.len(), back_len = back.len()))]
    pub fn render(&self, front: &[u8], back: &[u8]) -> Result<Vec<u8>, RenderError> {
        let started = Instant::now();

        let front_image = self.decode("front", front)?;
        let back_image = self.decode("back", back)?;

        let front_desc = ImageDescriptor::new(front_image.width(), front_image.height())?;
        let back_desc = ImageDescriptor::new(back_image.width(), back_image.height())?;
        let layout = compute_layout(&front_desc, &back_desc, &self.page);

        debug!(
            strategy = ?layout.strategy,
            unified_width = layout.unified_width(),
            unified_height = layout.unified_height(),
            "Layout computed"
        );

        let output = self.encode(front_image, back_image, &layout);

        metrics::histogram!("document_render_seconds").record(started.elapsed().as_secs_f64());
        info!(bytes = output.len(), "Document rendered");

        Ok(output)
    }

    /// Render on the blocking pool so the caller suspends instead of stalling the runtime.
    pub async fn render_async(
        self: &Arc<Self>,
        front: Vec<u8>,
        back: Vec<u8>,
    ) -> Result<Vec<u8>, RenderError> {
        let renderer = Arc::clone(self);
        tokio::task::spawn_blocking(move || renderer.render(&front, &back))
            .await
            .map_err(|e| RenderError::Interrupted(e.to_string()))?
    }

    fn decode(&self, side: &'static str, bytes: &[u8]) -> Result<DynamicImage, RenderError> {
        if bytes.is_empty() {
            return Err(RenderError::MissingImage { side });
        }
        if bytes.len() > self.max_image_bytes {
            return Err(RenderError::TooLarge {
                side,
                size: bytes.len(),
                limit: self.max_image_bytes,
            });
        }
        image::load_from_memory(bytes).map_err(|e| RenderError::Decode {
            side,
            reason: e.to_string(),
        })
    }

    fn encode(&self, front: DynamicImage, back: DynamicImage, layout: &PageLayout) -> Vec<u8> {
        let page_w = Mm(self.page.page_width as f32);
        let page_h = Mm(self.page.page_height as f32);

        let mut doc = PdfDocument::new(&self.title);
        let ops = vec![
            self.place(&mut doc, front, &layout.front),
            self.place(&mut doc, back, &layout.back),
        ];

        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        doc.save(&PdfSaveOptions::default(), &mut warnings)
    }

    /// Embed an image and return the op drawing it stretched into `placement`.
    fn place(&self, doc: &mut PdfDocument, image: DynamicImage, placement: &Placement) -> Op {
        let width_px = image.width() as usize;
        let height_px = image.height() as usize;

        let raw = RawImage {
            pixels: RawImageData::U8(image.to_rgb8().into_raw()),
            width: width_px,
            height: height_px,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let id = doc.add_image(&raw);

        // Native size at EMBED_DPI, then scaled to the unified placement size.
        let native_w_pt = width_px as f32 / EMBED_DPI * 72.0;
        let native_h_pt = height_px as f32 / EMBED_DPI * 72.0;
        let target_w_pt = Mm(placement.width as f32).into_pt().0;
        let target_h_pt = Mm(placement.height as f32).into_pt().0;

        let bottom_mm = self.page.page_height - placement.y - placement.height;

        Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Mm(placement.x as f32).into_pt()),
                translate_y: Some(Mm(bottom_mm as f32).into_pt()),
                scale_x: Some(target_w_pt / native_w_pt),
                scale_y: Some(target_h_pt / native_h_pt),
                dpi: Some(EMBED_DPI),
                rotate: None,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Missing {side} image")]
    MissingImage { side: &'static str },

    #[error("The {side} image is {size} bytes, over the {limit} byte limit")]
    TooLarge {
        side: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("Failed to decode {side} image: {reason}")]
    Decode { side: &'static str, reason: String },

    #[error("Invalid image: {0}")]
    InvalidImage(#[from] LayoutError),

    #[error("Render task interrupted: {0}")]
    Interrupted(String),
}
