//! Durable get/put-by-key storage for chunk and metadata objects.
//!
//! Keys look like `{user_hash}/_meta` or `{user_hash}/{chunk_index}`. There
//! is no compare-and-swap; callers serialize per account (see `locks`).

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::ServerError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// `Ok(None)` when no object exists under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServerError>;

    /// Replace the object under `key`.
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), ServerError>;
}

/// Reject anything but `segment(/segment)*` with `[A-Za-z0-9_]` segments.
fn validate_key(key: &str) -> Result<(), ServerError> {
    let valid = !key.is_empty()
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(ServerError::BadRequest(format!("Invalid object key: {key}")))
    }
}

/// Verify that a resolved path stays within the expected base directory.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, ServerError> {
    let mut resolved = base.to_path_buf();
    for component in target.strip_prefix(base).unwrap_or(target).components() {
        match component {
            Component::Normal(c) => resolved.push(c),
            _ => {
                return Err(ServerError::BadRequest(
                    "Path traversal detected".to_string(),
                ));
            }
        }
    }
    Ok(resolved)
}

/// Objects as files under a base directory, one sub-directory per account.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    base_path: PathBuf,
}

impl FsObjectStore {
    pub async fn new(base_path: PathBuf) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::ObjectStore(format!(
                "Failed to create storage directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Object store initialized");

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, ServerError> {
        validate_key(key)?;
        ensure_within(&self.base_path, Path::new(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServerError> {
        let path = self.object_path(key)?;

        match fs::read(&path).await {
            Ok(data) => {
                debug!(key, size = data.len(), "Read object");
                Ok(Some(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServerError::ObjectStore(format!(
                "Failed to read object {key}: {e}"
            ))),
        }
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<(), ServerError> {
        let path = self.object_path(key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ServerError::ObjectStore(format!("Failed to create directory for {key}: {e}"))
            })?;
        }

        // Write-then-rename so readers never observe a half-written object.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data)
            .await
            .map_err(|e| ServerError::ObjectStore(format!("Failed to write object {key}: {e}")))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| ServerError::ObjectStore(format!("Failed to commit object {key}: {e}")))?;

        debug!(key, size = data.len(), "Stored object");
        Ok(())
    }
}

/// In-process object store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServerError> {
        validate_key(key)?;
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<(), ServerError> {
        validate_key(key)?;
        self.objects
            .write()
            .await
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }
}
