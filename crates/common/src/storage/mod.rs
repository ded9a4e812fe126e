//! Object storage for original PDF bytes

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use regex_lite::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;

const LOCAL_SCHEME: &str = "file://";
const MEMORY_SCHEME: &str = "mem://";

/// Blob store keyed by name, returning an opaque locator
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `name` and return the locator
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String>;

    async fn get(&self, locator: &str) -> Result<Vec<u8>>;

    /// Remove an object; a missing object is not an error
    async fn delete(&self, locator: &str) -> Result<()>;
}

fn unsafe_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9.-]").expect("name pattern is valid"))
}

/// `<unix-millis>-<name>` with every character outside `[A-Za-z0-9.-]` replaced by `_`
pub fn storage_name(original_name: &str, unix_millis: i64) -> String {
    format!(
        "{}-{}",
        unix_millis,
        unsafe_chars().replace_all(original_name, "_")
    )
}

/// Stores objects as files under a root directory
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, locator: &str) -> Result<PathBuf> {
        let name = locator
            .strip_prefix(LOCAL_SCHEME)
            .ok_or_else(|| AppError::Storage {
                message: format!("Not a local locator: {}", locator),
            })?;

        if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with("..") {
            return Err(AppError::Storage {
                message: format!("Invalid object name: {}", name),
            });
        }
        Ok(self.root.join(name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let locator = format!("{}{}", LOCAL_SCHEME, name);
        let path = self.path_for(&locator)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Storage {
                message: format!("Failed to create {}: {}", self.root.display(), e),
            })?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Storage {
                message: format!("Failed to write {}: {}", path.display(), e),
            })?;

        tracing::debug!(locator = %locator, bytes = bytes.len(), "Object stored");
        Ok(locator)
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        let path = self.path_for(locator)?;
        tokio::fs::read(&path).await.map_err(|e| AppError::Storage {
            message: format!("Failed to read {}: {}", path.display(), e),
        })
    }

    async fn delete(&self, locator: &str) -> Result<()> {
        let path = self.path_for(locator)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(locator = %locator, "Object removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage {
                message: format!("Failed to remove {}: {}", path.display(), e),
            }),
        }
    }
}

/// Keeps objects in memory
#[derive(Default)]
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
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let locator = format!("{}{}", MEMORY_SCHEME, name);
        self.objects
            .write()
            .await
            .insert(locator.clone(), bytes.to_vec());
        Ok(locator)
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(locator)
            .cloned()
            .ok_or_else(|| AppError::Storage {
                message: format!("Object not found: {}", locator),
            })
    }

    async fn delete(&self, locator: &str) -> Result<()> {
        self.objects.write().await.remove(locator);
        Ok(())
    }
}

/// Create an object store based on configuration
pub fn create_object_store(config: &StorageConfig) -> Arc<dyn ObjectStore> {
    match config.backend.as_str() {
        "memory" => Arc::new(MemoryObjectStore::new()),
        "local" => Arc::new(LocalObjectStore::new(config.root.clone())),
        other => {
            tracing::warn!(backend = other, "Unknown storage backend, using local");
            Arc::new(LocalObjectStore::new(config.root.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_storage_name_sanitises() {
        assert_eq!(
            storage_name("Master Services (v2).pdf", 1700000000000),
            "1700000000000-Master_Services__v2_.pdf"
        );
        assert_eq!(storage_name("../etc/passwd", 1), "1-.._etc_passwd");
        assert_eq!(storage_name("contrat-été.pdf", 5), "5-contrat-_t_.pdf");
    }

    #[tokio::test]
    async fn test_local_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().join("objects"));

        let locator = store.put("1-a.pdf", b"%PDF-1.4").await.unwrap();
        assert_eq!(locator, "file://1-a.pdf");
        assert_eq!(store.get(&locator).await.unwrap(), b"%PDF-1.4");
        assert!(store.root().join("1-a.pdf").exists());

        assert_ok!(store.delete(&locator).await);
        assert!(!store.root().join("1-a.pdf").exists());
        assert_err!(store.get(&locator).await);
        assert_ok!(store.delete(&locator).await);
    }

    #[tokio::test]
    async fn test_local_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        assert_err!(store.get("file://../secret").await);
        assert_err!(store.get("mem://1-a.pdf").await);
        assert_err!(store.put("a/b.pdf", b"x").await);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryObjectStore::new();
        let locator = assert_ok!(store.put("1-a.pdf", b"bytes").await);
        assert_eq!(store.get(&locator).await.unwrap(), b"bytes");
        assert_eq!(store.len().await, 1);
        assert_err!(store.get("mem://missing").await);

        assert_ok!(store.delete(&locator).await);
        assert_eq!(store.len().await, 0);
    }
}
