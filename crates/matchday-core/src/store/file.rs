//! File-backed store.
//!
//! All entries live in one JSON object on disk. The file is read once when
//! the store is opened and rewritten after every mutation (temp file +
//! rename, so a crash mid-write leaves the previous version intact). A
//! mutation only becomes visible to reads once it is on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::KvStore;
use crate::error::StoreError;

pub struct FileStore {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file is an empty store. An unreadable document is discarded
    /// (the cache is a disposable mirror) and replaced on the next write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let items = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(items) => items,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding unreadable storage file");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), entries = items.len(), "Opened file store");
        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let contents = serde_json::to_string(items)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self.items.lock().await;
        let mut next = items.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next).await?;
        *items = next;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.multi_remove(&[key.to_string()]).await
    }

    async fn multi_remove(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut items = self.items.lock().await;
        if !keys.iter().any(|key| items.contains_key(key)) {
            return Ok(());
        }
        let mut next = items.clone();
        for key in keys {
            next.remove(key);
        }
        self.persist(&next).await?;
        *items = next;
        Ok(())
    }

    async fn all_keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.items.lock().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = FileStore::open(&path).await.unwrap();
        store.set_item("cache_teams:all", "{}").await.unwrap();
        store.set_item("app_version", "1.0.0").await.unwrap();
        store.remove_item("app_version").await.unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get_item("cache_teams:all").await.unwrap().as_deref(),
            Some("{}")
        );
        assert_eq!(reopened.get_item("app_version").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_entries_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let store = FileStore::open(nested.join("storage.json")).await.unwrap();
        store.set_item("kept", "1").await.unwrap();

        // Writes fail once the directory is gone
        std::fs::remove_dir_all(&nested).unwrap();

        assert!(store.set_item("new", "2").await.is_err());
        assert_eq!(store.get_item("new").await.unwrap(), None);

        assert!(store.remove_item("kept").await.is_err());
        assert!(store.multi_remove(&["kept".to_string()]).await.is_err());
        assert_eq!(store.get_item("kept").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.all_keys().await.unwrap(), vec!["kept".to_string()]);

        // Removing an absent key never touches the disk
        store.remove_item("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_garbage_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = FileStore::open(&path).await.unwrap();
        assert!(store.all_keys().await.unwrap().is_empty());

        store.set_item("k", "v").await.unwrap();
        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get_item("k").await.unwrap().as_deref(), Some("v"));
    }
}
