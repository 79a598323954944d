//! Object store client
//!
//! Implements the storage service's resumable upload protocol: a transfer is
//! opened with a start request, the bytes follow in fixed-size chunks, and
//! the finalize response carries the public download URL. Each transfer
//! reports incremental progress and honors a cancellation token between
//! chunks; retry and timeout beyond the HTTP client's own are left to the
//! transport, which is the storage provider's contract.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{HearthError, Result};

/// Coarse state of a transfer, reported alongside byte counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Queued,
    Running,
    Paused,
}

/// Incremental progress of a single transfer
#[derive(Debug, Clone)]
pub struct TransferProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    pub state: TransferState,
}

pub type ProgressSender = mpsc::UnboundedSender<TransferProgress>;

/// Capability seam over the object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` under `key` and resolve to a publicly fetchable URL.
    ///
    /// Progress events go to `progress` when given; a send failure there must
    /// never affect the transfer outcome. The transfer stops with an error
    /// when `cancel` fires.
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<String>;

    /// Remove the object stored under `key`
    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct FinalizeResponse {
    #[serde(rename = "downloadUrl")]
    download_url: String,
}

/// HTTP implementation of [`ObjectStore`] speaking the resumable protocol
#[derive(Debug, Clone)]
pub struct ResumableStorageClient {
    client: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl ResumableStorageClient {
    /// Chunk size for resumable transfers
    const CHUNK_SIZE: usize = 8 * 1024 * 1024;

    pub fn new(base_url: String, timeout_secs: u64, bearer_token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            bearer_token,
        })
    }

    fn objects_url(&self) -> String {
        format!("{}/objects", self.base_url.trim_end_matches('/'))
    }

    fn send_progress(progress: &Option<ProgressSender>, event: TransferProgress) {
        // Observer gone is fine; progress is observability only.
        if let Some(tx) = progress {
            let _ = tx.send(event);
        }
    }

    async fn start_session(&self, key: &str, total_bytes: u64) -> Result<String> {
        let response = self
            .client
            .post(self.objects_url())
            .query(&[("name", key)])
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .header("X-Upload-Protocol", "resumable")
            .header("X-Upload-Command", "start")
            .header("X-Upload-Content-Length", total_bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HearthError::upload(format!(
                "could not open transfer for '{}': {}",
                key,
                response.status()
            )));
        }

        response
            .headers()
            .get("X-Upload-URL")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| HearthError::upload("transfer session URL missing from start response"))
    }

    async fn put_chunk(
        &self,
        session_url: &str,
        offset: u64,
        chunk: &[u8],
        finalize: bool,
    ) -> Result<reqwest::Response> {
        let command = if finalize { "upload, finalize" } else { "upload" };

        let response = self
            .client
            .put(session_url)
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .header("X-Upload-Command", command)
            .header("X-Upload-Offset", offset)
            .body(chunk.to_vec())
            .send()
            .await?;

        Ok(response)
    }
}

#[async_trait]
impl ObjectStore for ResumableStorageClient {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<String> {
        let total_bytes = bytes.len() as u64;

        Self::send_progress(
            &progress,
            TransferProgress {
                bytes_transferred: 0,
                total_bytes,
                state: TransferState::Queued,
            },
        );

        let session_url = self.start_session(key, total_bytes).await?;

        let mut offset = 0u64;
        let mut final_response = None;
        let chunk_count = bytes.chunks(Self::CHUNK_SIZE).len();

        for (i, chunk) in bytes.chunks(Self::CHUNK_SIZE).enumerate() {
            if cancel.is_cancelled() {
                return Err(HearthError::upload_cancelled());
            }

            let finalize = i + 1 == chunk_count;
            let mut response = self.put_chunk(&session_url, offset, chunk, finalize).await?;

            // 308 means the service wants the chunk again; report the pause
            // and retry once before giving up.
            if response.status() == StatusCode::PERMANENT_REDIRECT {
                Self::send_progress(
                    &progress,
                    TransferProgress {
                        bytes_transferred: offset,
                        total_bytes,
                        state: TransferState::Paused,
                    },
                );
                response = self.put_chunk(&session_url, offset, chunk, finalize).await?;
            }

            if !response.status().is_success() {
                return Err(HearthError::upload(format!(
                    "transfer of '{}' failed at offset {}: {}",
                    key,
                    offset,
                    response.status()
                )));
            }

            offset += chunk.len() as u64;
            Self::send_progress(
                &progress,
                TransferProgress {
                    bytes_transferred: offset,
                    total_bytes,
                    state: TransferState::Running,
                },
            );

            if finalize {
                final_response = Some(response);
            }
        }

        let final_response =
            final_response.ok_or_else(|| HearthError::upload("empty transfer body"))?;

        let finalize: FinalizeResponse = final_response
            .json()
            .await
            .map_err(|e| HearthError::upload(format!("invalid finalize response: {}", e)))?;

        Ok(finalize.download_url)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.objects_url())
            .query(&[("name", key)])
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HearthError::delete_failed(format!(
                "could not delete '{}': {}",
                key,
                response.status()
            )));
        }

        Ok(())
    }
}
