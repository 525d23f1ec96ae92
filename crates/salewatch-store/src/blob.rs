use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::CacheError;

/// Key → bytes persistence collaborator.
///
/// Keys are flat names such as `data.json`; they never contain path
/// separators.
pub trait BlobStore: Send + Sync {
    fn write(&self, key: &str, bytes: Vec<u8>) -> impl Future<Output = Result<(), CacheError>> + Send;

    fn read(&self, key: &str) -> impl Future<Output = Result<Vec<u8>, CacheError>> + Send;

    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, CacheError>> + Send;

    /// Deletes `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), CacheError>> + Send;
}

fn validate_key(key: &str) -> Result<(), CacheError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && !key.contains(['/', '\\'])
        && !key.chars().any(char::is_control);
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey {
            key: key.to_owned(),
        })
    }
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Stores each key as a file under `root`.
///
/// Writes go to a hidden temporary file in the same directory which is then
/// renamed over the target, so readers only ever see a complete snapshot.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CacheError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

fn io_error(key: &str, source: std::io::Error) -> CacheError {
    CacheError::Io {
        key: key.to_owned(),
        source,
    }
}

impl BlobStore for FsBlobStore {
    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error(key, e))?;

        // Unique per write so overlapping cycles never share a temp file.
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self
            .root
            .join(format!(".{key}.{}.{seq}.tmp", std::process::id()));

        if let Err(e) = tokio::fs::write(&tmp_path, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(io_error(key, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            tracing::warn!(key, error = %e, "failed to move snapshot into place");
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(io_error(key, e));
        }

        tracing::debug!(key, size = bytes.len(), path = %path.display(), "snapshot written");
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CacheError::Missing {
                key: key.to_owned(),
            }),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error(key, e))
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }
}

/// In-process store, used by tests and one-shot CLI runs.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.lock().await.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        validate_key(key)?;
        self.blobs.lock().await.insert(key.to_owned(), bytes);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        validate_key(key)?;
        self.blobs
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::Missing {
                key: key.to_owned(),
            })
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        validate_key(key)?;
        Ok(self.blobs.lock().await.contains_key(key))
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        validate_key(key)?;
        self.blobs.lock().await.remove(key);
        Ok(())
    }
}
