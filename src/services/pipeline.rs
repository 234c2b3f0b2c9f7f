use std::collections::HashSet;

use tracing::info;

use crate::models::batch::{Batch, BatchItem};
use crate::models::recognition::DocumentSide;
use crate::services::fallback::FallbackCascade;
use crate::services::naming::{batch_fallback_name, document_file_name};
use crate::services::packager::{entry_name, BatchPackager, PackagedBatch, PackagingError};

/// Recognize the front of each item in order and name items that have no
/// pinned file name.
///
/// Derived names never collide with each other or with a pinned name: a
/// repeated name gets the item's 1-based position appended.
pub async fn recognize_batch(cascade: &FallbackCascade, items: &mut [BatchItem]) {
    let mut taken: HashSet<String> = items
        .iter()
        .filter(|item| !item.target_file_name.is_empty())
        .map(|item| entry_name(&item.target_file_name))
        .collect();

    for (index, item) in items.iter_mut().enumerate() {
        let hint = if item.source_name.is_empty() {
            item.target_file_name.clone()
        } else {
            item.source_name.clone()
        };

        let outcome = cascade
            .recognize_with_fallback(&item.front, DocumentSide::Front, &hint)
            .await;

        if item.target_file_name.is_empty() {
            let derived = document_file_name(&outcome, &batch_fallback_name(index));
            item.target_file_name = unique_name(derived, index, &mut taken);
        }

        info!(
            item = index + 1,
            file_name = %item.target_file_name,
            synthetic = outcome.is_synthetic,
            succeeded = outcome.succeeded,
            "Batch item recognized"
        );
        item.outcome = Some(outcome);
    }
}

fn unique_name(name: String, index: usize, taken: &mut HashSet<String>) -> String {
    let mut candidate = name.clone();
    let mut suffix = index + 1;
    while taken.contains(&entry_name(&candidate)) {
        candidate = format!("{}_{}", name, suffix);
        suffix += 1;
    }
    taken.insert(entry_name(&candidate));
    candidate
}

/// Recognize, name and package a batch.
pub async fn recognize_and_package(
    cascade: &FallbackCascade,
    packager: &BatchPackager,
    batch: impl Into<Batch>,
) -> Result<PackagedBatch, PackagingError> {
    let mut batch = batch.into();
    recognize_batch(cascade, batch.items_mut()).await;
    packager.run_batch(batch).await
}
