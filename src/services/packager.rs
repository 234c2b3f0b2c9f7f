use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::Arc;

use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::models::batch::{Batch, BatchItem, BatchResult, ItemReport, ItemStatus};
use crate::services::renderer::DocumentRenderer;

/// Output of a batch run: per-item report plus the serialized archive.
#[derive(Debug, Clone)]
pub struct PackagedBatch {
    pub result: BatchResult,
    pub archive: Vec<u8>,
}

/// Renders batch items one after another and collects the documents into a
/// single ZIP archive.
pub struct BatchPackager {
    renderer: Arc<DocumentRenderer>,
}

impl BatchPackager {
    pub fn new(renderer: Arc<DocumentRenderer>) -> Self {
        Self { renderer }
    }

    /// Process the batch in order. Item failures are recorded and skipped; only
    /// archive errors abort the run.
    pub async fn run_batch(
        &self,
        batch: impl Into<Batch>,
    ) -> Result<PackagedBatch, PackagingError> {
        let items = batch.into().into_items();
        let total = items.len();
        let mut archive = ArchiveBuilder::new();
        let mut result = BatchResult::default();

        for (index, mut item) in items.into_iter().enumerate() {
            let rendered = match item.advance(ItemStatus::Running) {
                Ok(()) => self.render_item(&item).await,
                Err(e) => Err(e.to_string()),
            };

            let outcome = match rendered {
                Ok(document) => archive.add(&item.target_file_name, &document)?,
                Err(reason) => Err(reason),
            };

            match outcome {
                Ok(entry) => {
                    let _ = item.advance(ItemStatus::Done);
                    metrics::counter!("batch_items_total", "result" => "success").increment(1);
                    info!(item = index + 1, total, entry = %entry, "Batch item packaged");
                    result.success_count += 1;
                    result.per_item.push(ItemReport {
                        id: item.id,
                        target_file_name: item.target_file_name,
                        success: true,
                        error: None,
                    });
                }
                Err(reason) => {
                    let _ = item.advance(ItemStatus::Failed);
                    metrics::counter!("batch_items_total", "result" => "failure").increment(1);
                    warn!(item = index + 1, total, error = %reason, "Batch item failed");
                    result.failure_count += 1;
                    result.per_item.push(ItemReport {
                        id: item.id,
                        target_file_name: item.target_file_name,
                        success: false,
                        error: Some(reason),
                    });
                }
            }
        }

        let archive = archive.finish()?;

        info!(
            success = result.success_count,
            failure = result.failure_count,
            archive_bytes = archive.len(),
            "Batch complete"
        );

        Ok(PackagedBatch { result, archive })
    }

    async fn render_item(&self, item: &BatchItem) -> Result<Vec<u8>, String> {
        let back = match &item.back {
            Some(back) if !back.is_empty() => back.clone(),
            _ => return Err("missing back image".to_string()),
        };
        if item.front.is_empty() {
            return Err("missing front image".to_string());
        }

        self.renderer
            .render_async(item.front.clone(), back)
            .await
            .map_err(|e| e.to_string())
    }
}

/// In-memory ZIP archive that refuses to overwrite an existing entry.
struct ArchiveBuilder {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    entries: HashSet<String>,
}

impl ArchiveBuilder {
    fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            entries: HashSet::new(),
        }
    }

    /// Append a document. The inner `Err` is an item-level failure; the outer
    /// one means the archive itself is broken.
    fn add(
        &mut self,
        file_name: &str,
        document: &[u8],
    ) -> Result<Result<String, String>, PackagingError> {
        let entry = entry_name(file_name);
        if !self.entries.insert(entry.clone()) {
            return Ok(Err(format!("duplicate file name {}", entry)));
        }

        self.zip.start_file(entry.as_str(), self.options)?;
        self.zip.write_all(document)?;
        Ok(Ok(entry))
    }

    fn finish(self) -> Result<Vec<u8>, PackagingError> {
        Ok(self.zip.finish()?.into_inner())
    }
}

/// Archive entry name for a document, with `.pdf` appended when absent.
pub fn entry_name(file_name: &str) -> String {
    if file_name.to_ascii_lowercase().ends_with(".pdf") {
        file_name.to_string()
    } else {
        format!("{}.pdf", file_name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Archive write failed: {0}")]
    Io(#[from] std::io::Error),
}
