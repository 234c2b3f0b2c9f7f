use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::recognition::RecognitionOutcome;

/// Lifecycle of a batch item. Transitions only move forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl ItemStatus {
    pub fn can_advance_to(self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Pending, ItemStatus::Running)
                | (ItemStatus::Running, ItemStatus::Done)
                | (ItemStatus::Running, ItemStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Done | ItemStatus::Failed)
    }
}

/// One front/back pair queued for rendering.
#[derive(Clone)]
pub struct BatchItem {
    pub id: Uuid,
    pub front: Vec<u8>,
    pub back: Option<Vec<u8>>,
    /// Upload name of the front image; used as the synthetic-name hint.
    pub source_name: String,
    /// Archive entry name. Empty means "derive it from recognition".
    pub target_file_name: String,
    pub outcome: Option<RecognitionOutcome>,
    status: ItemStatus,
}

impl BatchItem {
    pub fn new(front: Vec<u8>, back: Option<Vec<u8>>, target_file_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            front,
            back,
            source_name: String::new(),
            target_file_name: target_file_name.into(),
            outcome: None,
            status: ItemStatus::Pending,
        }
    }

    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// Move to `next`, rejecting backward or skipping transitions.
    pub fn advance(&mut self, next: ItemStatus) -> Result<(), BatchError> {
        if !self.status.can_advance_to(next) {
            return Err(BatchError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

impl fmt::Debug for BatchItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchItem")
            .field("id", &self.id)
            .field("front_bytes", &self.front.len())
            .field("back_bytes", &self.back.as_ref().map(Vec::len))
            .field("source_name", &self.source_name)
            .field("target_file_name", &self.target_file_name)
            .field("status", &self.status)
            .finish()
    }
}

/// Ordered collection of pending items, owned by the caller until run.
#[derive(Debug, Default)]
pub struct Batch {
    items: Vec<BatchItem>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an item and return its id.
    pub fn push(&mut self, item: BatchItem) -> Uuid {
        let id = item.id;
        self.items.push(item);
        id
    }

    pub fn remove(&mut self, id: Uuid) -> Result<BatchItem, BatchError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(BatchError::UnknownItem(id))?;
        Ok(self.items.remove(index))
    }

    pub fn get(&self, id: Uuid) -> Option<&BatchItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items_mut(&mut self) -> &mut [BatchItem] {
        &mut self.items
    }

    pub fn into_items(self) -> Vec<BatchItem> {
        self.items
    }
}

impl From<Vec<BatchItem>> for Batch {
    fn from(items: Vec<BatchItem>) -> Self {
        Self { items }
    }
}

/// Per-item entry of a batch result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemReport {
    pub id: Uuid,
    pub target_file_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of a batch run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub per_item: Vec<ItemReport>,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.per_item.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.per_item.iter().filter(|report| !report.success)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Item {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: Uuid,
        from: ItemStatus,
        to: ItemStatus,
    },

    #[error("No batch item with id {0}")]
    UnknownItem(Uuid),
}
