//! Identity document storage.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::config::MAX_DOCUMENT_BYTES;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// A file received with a signup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Stores documents and returns the key they were saved under.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn store(&self, owner_id: Uuid, document: UploadedDocument) -> AppResult<String>;
}

/// Writes documents below a root directory on the local filesystem.
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn store(&self, owner_id: Uuid, document: UploadedDocument) -> AppResult<String> {
        if document.bytes.is_empty() {
            return Err(AppError::validation("Uploaded document is empty"));
        }
        if document.bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(AppError::validation("Uploaded document is too large"));
        }

        let key = document_key(owner_id, Utc::now().timestamp_millis(), &document.file_name);
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::internal(format!("Failed to create document dir: {}", e)))?;
        }
        tokio::fs::write(&path, &document.bytes)
            .await
            .map_err(|e| AppError::internal(format!("Failed to write document: {}", e)))?;

        tracing::info!(owner_id = %owner_id, key = %key, "Identity document stored");
        Ok(key)
    }
}

/// `{owner}/{unix_millis}_{sanitized_name}`
pub fn document_key(owner_id: Uuid, millis: i64, file_name: &str) -> String {
    format!("{}/{}_{}", owner_id, millis, sanitize_file_name(file_name))
}

fn sanitize_file_name(name: &str) -> String {
    // Only the final path component survives.
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}
