//! Upload orchestrator
//!
//! Takes the ordered batch of images selected for a listing, uploads every
//! file concurrently and resolves to an order-preserving list of public
//! URLs. A single failing transfer fails the whole batch: the remaining
//! transfers are cancelled and every object that already finished is deleted
//! best-effort, so no partial URL list ever reaches the caller.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{HearthError, Result};
use crate::listing::{ImageFile, MAX_IMAGES};
use crate::storage::{ObjectStore, TransferProgress};

/// Progress of one file within a batch, tagged with its input position
#[derive(Debug, Clone)]
pub struct UploadProgress {
    pub index: usize,
    pub file_name: String,
    pub transfer: TransferProgress,
}

/// Orchestrates the per-listing image batch against the object store
pub struct UploadService {
    store: Arc<dyn ObjectStore>,
    observer: Option<mpsc::UnboundedSender<UploadProgress>>,
}

impl UploadService {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            observer: None,
        }
    }

    /// Attach a progress observer. Events are advisory: a full or dropped
    /// channel never affects the batch result.
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<UploadProgress>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Storage key for one file: namespaced by owner and original file name,
    /// plus a fresh token so identical names (or re-uploads of the same
    /// file) never collide.
    fn storage_key(owner_id: &str, file_name: &str) -> String {
        format!("images/{}-{}-{}", owner_id, file_name, Uuid::new_v4())
    }

    /// Upload `files` for `owner_id` and return their public URLs in input
    /// order, regardless of completion order.
    pub async fn upload_batch(&self, owner_id: &str, files: Vec<ImageFile>) -> Result<Vec<String>> {
        if files.is_empty() {
            return Err(HearthError::invalid_input("at least one image is required"));
        }
        if files.len() > MAX_IMAGES {
            return Err(HearthError::too_many_images(MAX_IMAGES));
        }

        let batch_token = CancellationToken::new();
        let total = files.len();
        tracing::debug!(files = total, owner = owner_id, "starting image batch");

        // Fan-out: one task per file, handles kept in input order.
        let mut transfers: Vec<(String, JoinHandle<Result<String>>)> = Vec::with_capacity(total);
        for (index, file) in files.into_iter().enumerate() {
            let key = Self::storage_key(owner_id, &file.name);
            let store = Arc::clone(&self.store);
            let cancel = batch_token.child_token();
            let progress = self.observer.as_ref().map(|observer| {
                spawn_progress_forwarder(observer.clone(), index, file.name.clone())
            });

            let task_key = key.clone();
            let handle = tokio::spawn(async move {
                store.upload(&task_key, file.bytes, progress, cancel).await
            });
            transfers.push((key, handle));
        }

        // Fan-in: drain positionally so the result order is the input order.
        // After the first failure the batch token stops the transfers still
        // in flight, but every handle is still awaited so the set of
        // finished objects is known exactly.
        let mut urls: Vec<Option<String>> = vec![None; total];
        let mut finished_keys: Vec<String> = Vec::new();
        let mut first_error: Option<HearthError> = None;

        for (index, (key, handle)) in transfers.into_iter().enumerate() {
            let result = handle
                .await
                .map_err(|e| HearthError::internal(format!("transfer task failed: {}", e)));

            match result.and_then(|r| r) {
                Ok(url) => {
                    urls[index] = Some(url);
                    finished_keys.push(key);
                }
                Err(e) => {
                    if first_error.is_none() {
                        tracing::warn!(index, error = %e, "transfer failed, aborting batch");
                        batch_token.cancel();
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(error) = first_error {
            self.cleanup_finished(&finished_keys).await;
            return Err(error);
        }

        // Every slot is filled when no transfer failed.
        Ok(urls.into_iter().flatten().collect())
    }

    /// Best-effort deletion of objects whose siblings failed. A cleanup
    /// failure is logged, never raised: the caller already has the upload
    /// error, and a leaked object is preferable to masking it.
    async fn cleanup_finished(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.store.delete(key).await {
                tracing::warn!(key = %key, error = %e, "failed to delete orphaned object");
            }
        }
    }
}

/// Bridge a transfer's progress events into the batch observer, tagging each
/// with the file's input position.
fn spawn_progress_forwarder(
    observer: mpsc::UnboundedSender<UploadProgress>,
    index: usize,
    file_name: String,
) -> mpsc::UnboundedSender<TransferProgress> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(transfer) = rx.recv().await {
            let _ = observer.send(UploadProgress {
                index,
                file_name: file_name.clone(),
                transfer,
            });
        }
    });
    tx
}
