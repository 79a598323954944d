//! Mock implementations for testing

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::auth::{AuthProvider, Session};
use crate::documents::DocumentStore;
use crate::error::{HearthError, Result};
use crate::storage::{ObjectStore, ProgressSender, TransferProgress, TransferState};

/// Mock identity provider
///
/// Issues deterministic sessions derived from the email address, so a login
/// followed by `current_session` sees the same user.
#[derive(Debug, Clone)]
pub struct MockAuthProvider {
    fail_sign_in: bool,
    issue_expired_tokens: bool,
    display_name_updates: Arc<Mutex<Vec<String>>>,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self {
            fail_sign_in: false,
            issue_expired_tokens: false,
            display_name_updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every sign-in attempt fails as if the credentials were wrong
    pub fn with_sign_in_failure(mut self) -> Self {
        self.fail_sign_in = true;
        self
    }

    /// Sign-in succeeds but hands out an already-stale token, forcing the
    /// caller through the refresh path
    pub fn with_expired_tokens(mut self) -> Self {
        self.issue_expired_tokens = true;
        self
    }

    /// Names passed to `update_display_name`, in call order
    pub fn display_name_updates(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.display_name_updates)
    }

    fn session_for(&self, email: &str, expired: bool) -> Session {
        let user = email.split('@').next().unwrap_or(email);
        let expires_at = if expired {
            Utc::now() - Duration::seconds(10)
        } else {
            Utc::now() + Duration::hours(1)
        };

        Session {
            user_id: format!("uid-{}", user),
            email: email.to_string(),
            display_name: None,
            id_token: format!("id-token-{}", user),
            refresh_token: format!("refresh-token-{}", user),
            expires_at,
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn sign_in(&self, email: &str, _password: &str) -> Result<Session> {
        if self.fail_sign_in {
            return Err(HearthError::authentication("wrong email or password"));
        }
        Ok(self.session_for(email, self.issue_expired_tokens))
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<Session> {
        Ok(self.session_for(email, self.issue_expired_tokens))
    }

    async fn update_display_name(&self, _session: &Session, name: &str) -> Result<()> {
        self.display_name_updates
            .lock()
            .unwrap()
            .push(name.to_string());
        Ok(())
    }

    async fn refresh(&self, session: &Session) -> Result<Session> {
        Ok(self.session_for(&session.email, false))
    }
}

/// Mock object store with per-file delay and failure injection, matched by
/// substring of the storage key
#[derive(Debug, Default)]
pub struct MockObjectStore {
    delays_ms: Vec<(String, u64)>,
    failures: Vec<String>,
    failing_deletes: bool,
    uploaded: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay_ms(mut self, name: &str, millis: u64) -> Self {
        self.delays_ms.push((name.to_string(), millis));
        self
    }

    pub fn with_failure(mut self, name: &str) -> Self {
        self.failures.push(name.to_string());
        self
    }

    pub fn with_failing_deletes(mut self) -> Self {
        self.failing_deletes = true;
        self
    }

    /// Keys in the order their transfers started
    pub fn uploaded_keys(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.uploaded.lock().unwrap().len()
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn delay_for(&self, key: &str) -> Option<u64> {
        self.delays_ms
            .iter()
            .find(|(name, _)| key.contains(name.as_str()))
            .map(|(_, ms)| *ms)
    }

    fn should_fail(&self, key: &str) -> bool {
        self.failures.iter().any(|name| key.contains(name.as_str()))
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> Result<String> {
        self.uploaded.lock().unwrap().push(key.to_string());

        let total_bytes = bytes.len() as u64;
        if let Some(tx) = &progress {
            let _ = tx.send(TransferProgress {
                bytes_transferred: 0,
                total_bytes,
                state: TransferState::Queued,
            });
        }

        if let Some(millis) = self.delay_for(key) {
            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_millis(millis)) => {}
                _ = cancel.cancelled() => return Err(HearthError::upload_cancelled()),
            }
        }

        if self.should_fail(key) {
            return Err(HearthError::upload("simulated transfer failure"));
        }

        if let Some(tx) = &progress {
            let _ = tx.send(TransferProgress {
                bytes_transferred: total_bytes,
                total_bytes,
                state: TransferState::Running,
            });
        }

        Ok(format!("https://objects.hearth.test/{}", key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        if self.failing_deletes {
            return Err(HearthError::delete_failed("simulated delete failure"));
        }
        Ok(())
    }
}

/// In-memory document store. Like the real service it assigns `created_at`
/// at write time and returns the document as stored.
#[derive(Debug, Default)]
pub struct MockDocumentStore {
    documents: Mutex<HashMap<(String, String), Value>>,
    fail_writes: bool,
    writes: Mutex<usize>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<Value> {
        if self.fail_writes {
            return Err(HearthError::persistence("simulated write failure"));
        }

        let mut stored = document;
        if let Some(object) = stored.as_object_mut() {
            if !object.contains_key("created_at") {
                object.insert("created_at".to_string(), serde_json::json!(Utc::now()));
            }
        }

        self.documents
            .lock()
            .unwrap()
            .insert((collection.to_string(), id.to_string()), stored.clone());
        *self.writes.lock().unwrap() += 1;

        Ok(stored)
    }
}
