//! Persistent key-value storage.
//!
//! The cache sits on top of a plain async string-to-string store, the same
//! shape as mobile platform storage. Two backends are provided:
//! - `MemoryStore`: process-local, used by tests and ephemeral sessions
//! - `FileStore`: a single JSON document on disk

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Async string-keyed, string-valued durable store.
///
/// Implementations are shared freely between tasks without external locking.
/// Every write replaces the whole value, so concurrent writers to one key
/// resolve as last-writer-wins.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    async fn multi_remove(&self, keys: &[String]) -> Result<(), StoreError>;

    async fn all_keys(&self) -> Result<Vec<String>, StoreError>;
}
