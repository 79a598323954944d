//! Persisted session storage

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::{HearthError, Result};

/// Session as written to disk between invocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session storage configuration
#[derive(Debug, Clone, Default)]
pub struct SessionStoreConfig {
    pub enabled: bool,
    pub storage_path: Option<PathBuf>,
    pub obfuscation_key: Option<String>,
}

/// Session storage manager
#[derive(Debug)]
pub struct SessionStore {
    config: SessionStoreConfig,
    session: Option<StoredSession>,
}

impl SessionStore {
    pub fn new(config: SessionStoreConfig) -> Result<Self> {
        let mut store = Self {
            config,
            session: None,
        };

        if store.config.enabled {
            store.load_session()?;
        }

        Ok(store)
    }

    pub fn store_session(&mut self, session: StoredSession) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        self.session = Some(session);
        self.save_session()
    }

    pub fn get_session(&self) -> Option<StoredSession> {
        if !self.config.enabled {
            return None;
        }
        self.session.clone()
    }

    pub fn remove_session(&mut self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        self.session = None;
        self.save_session()
    }

    fn storage_path(&self) -> Result<PathBuf> {
        self.config
            .storage_path
            .clone()
            .ok_or_else(|| HearthError::config("Session storage path not configured"))
    }

    fn load_session(&mut self) -> Result<()> {
        let path = self.storage_path()?;

        if !path.exists() {
            return Ok(());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| HearthError::internal(format!("Failed to read session storage: {}", e)))?;

        if content.trim().is_empty() {
            return Ok(());
        }

        let plain = if let Some(key) = &self.config.obfuscation_key {
            decode_content(&content, key)?
        } else {
            content
        };

        self.session = serde_json::from_str(&plain)
            .map_err(|e| HearthError::internal(format!("Failed to parse session storage: {}", e)))?;

        Ok(())
    }

    fn save_session(&self) -> Result<()> {
        let path = self.storage_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                HearthError::internal(format!("Failed to create storage directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(&self.session)?;

        let final_content = if let Some(key) = &self.config.obfuscation_key {
            encode_content(&content, key)
        } else {
            content
        };

        fs::write(&path, final_content)
            .map_err(|e| HearthError::internal(format!("Failed to write session storage: {}", e)))?;

        Ok(())
    }
}

// Obfuscation, not encryption: keeps tokens out of casual greps of the
// config dir. The key lives next to the data.
fn encode_content(content: &str, key: &str) -> String {
    let key_bytes = key.as_bytes();
    let mixed: Vec<u8> = content
        .bytes()
        .enumerate()
        .map(|(i, byte)| byte ^ key_bytes[i % key_bytes.len()])
        .collect();

    base64::engine::general_purpose::STANDARD.encode(mixed)
}

fn decode_content(encoded: &str, key: &str) -> Result<String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| HearthError::internal(format!("Failed to decode session storage: {}", e)))?;

    let key_bytes = key.as_bytes();
    let plain: Vec<u8> = bytes
        .iter()
        .enumerate()
        .map(|(i, byte)| byte ^ key_bytes[i % key_bytes.len()])
        .collect();

    String::from_utf8(plain)
        .map_err(|e| HearthError::internal(format!("Failed to decode session storage: {}", e)))
}
