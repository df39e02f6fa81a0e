//! The visible upload item list, newest first.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::types::{Status, UploadId, UploadItem, UploadProgress};

/// Shared list of upload items.
///
/// Items are only ever inserted at the front and never reordered. Each item is
/// written by exactly one task after creation.
#[derive(Clone, Default)]
pub(crate) struct ItemStore {
    items: Arc<RwLock<VecDeque<UploadItem>>>,
}

impl ItemStore {
    pub(crate) async fn insert_front(&self, item: UploadItem) {
        self.items.write().await.push_front(item);
    }

    /// Apply a transition; returns the updated item, or `None` if the id is unknown
    /// or the transition is illegal
    pub(crate) async fn transition(&self, id: UploadId, next: Status) -> Option<UploadItem> {
        let mut items = self.items.write().await;
        let item = items.iter_mut().find(|item| item.id == id)?;
        if !item.transition(next) {
            return None;
        }
        Some(item.clone())
    }

    /// Record progress; returns the resulting fraction
    pub(crate) async fn set_progress(&self, id: UploadId, progress: UploadProgress) -> Option<f64> {
        let mut items = self.items.write().await;
        let item = items.iter_mut().find(|item| item.id == id)?;
        item.set_progress(progress);
        Some(item.progress)
    }

    pub(crate) async fn set_server_filename(&self, id: UploadId, filename: &str) {
        let mut items = self.items.write().await;
        if let Some(item) = items.iter_mut().find(|item| item.id == id) {
            item.server_filename = Some(filename.to_string());
        }
    }

    pub(crate) async fn get(&self, id: UploadId) -> Option<UploadItem> {
        let items = self.items.read().await;
        items.iter().find(|item| item.id == id).cloned()
    }

    pub(crate) async fn snapshot(&self) -> Vec<UploadItem> {
        self.items.read().await.iter().cloned().collect()
    }
}
