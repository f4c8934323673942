use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::key::{self, KeyPattern, VERSION_KEY};
use super::policy::TtlPolicy;
use super::record::{self, CacheRecord, Decoded};
use crate::clock::{duration_ms, Clock};
use crate::store::KvStore;

/// Fixed ceiling for strict reads, independent of the TTL table.
pub const LEGACY_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Result of reading one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(CacheRecord<T>),
    Absent,
    /// The entry could not be decoded and has been deleted.
    Corrupt,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<CacheRecord<T>> {
        match self {
            Lookup::Found(record) => Some(record),
            Lookup::Absent | Lookup::Corrupt => None,
        }
    }
}

/// Data returned by a stale-allowed read, with its freshness.
#[derive(Debug, Clone, PartialEq)]
pub struct StaleRead<T> {
    pub data: T,
    pub is_stale: bool,
    pub age_ms: i64,
}

/// Freshness summary of one entry, for inspection tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub age_ms: i64,
    pub ttl: Duration,
    pub is_stale: bool,
}

impl EntryInfo {
    pub fn age_display(&self) -> String {
        record::describe_age(self.age_ms)
    }
}

/// Durable cache over a `KvStore`.
///
/// Holds no in-memory copy of the data: every read goes to the store. Store
/// failures never escape; they are logged and read as a miss.
pub struct CacheManager {
    store: Arc<dyn KvStore>,
    policy: TtlPolicy,
    clock: Arc<dyn Clock>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn KvStore>, policy: TtlPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    // ===== Writes =====

    /// Store `data` under `key`, replacing any previous record.
    pub async fn save<T: Serialize + ?Sized>(&self, key: &str, data: &T) {
        let record = CacheRecord::new(data, self.now_ms());
        let encoded = match record.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to encode cache record");
                return;
            }
        };

        if let Err(e) = self.store.set_item(&key::namespaced(key), &encoded).await {
            warn!(key = key, error = %e, "Failed to write cache entry");
        } else {
            debug!(key = key, "Cache entry saved");
        }
    }

    /// Replace one element of a cached list in place.
    ///
    /// The element whose `id` field equals `id` is swapped for `item` and the
    /// record timestamp is refreshed. Returns `false`, leaving storage alone,
    /// when the entry is missing, is not a list, or has no such element.
    pub async fn patch_list_item<T: Serialize>(&self, key: &str, id: &Value, item: &T) -> bool {
        let mut list = match self.lookup::<Value>(key).await {
            Lookup::Found(CacheRecord {
                data: Value::Array(list),
                ..
            }) => list,
            Lookup::Found(_) => {
                debug!(key = key, "Cached entry is not a list, skipping patch");
                return false;
            }
            Lookup::Absent | Lookup::Corrupt => return false,
        };

        let Some(slot) = list.iter_mut().find(|el| el.get("id") == Some(id)) else {
            debug!(key = key, id = %id, "No cached element with that id");
            return false;
        };

        match serde_json::to_value(item) {
            Ok(value) => *slot = value,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to encode patched element");
                return false;
            }
        }

        self.save(key, &list).await;
        true
    }

    // ===== Reads =====

    /// Read and decode an entry, deleting it if it is corrupt.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        let store_key = key::namespaced(key);
        let raw = match self.store.get_item(&store_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Absent,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read cache entry");
                return Lookup::Absent;
            }
        };

        match record::decode(&raw) {
            Decoded::Valid(record) => Lookup::Found(record),
            Decoded::Corrupt(reason) => {
                warn!(key = key, reason = %reason, "Removing corrupt cache entry");
                self.remove_quietly(&store_key).await;
                Lookup::Corrupt
            }
        }
    }

    /// Read with the fixed 24h ceiling; older entries are deleted.
    pub async fn load_strict<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let record = self.lookup::<T>(key).await.found()?;
        let age = record.age_ms(self.now_ms());
        if age > duration_ms(LEGACY_EXPIRY) {
            debug!(key = key, age_ms = age, "Cache entry past strict expiry, removing");
            self.remove_quietly(&key::namespaced(key)).await;
            return None;
        }
        Some(record.data)
    }

    /// Read regardless of age, reporting staleness against `ttl` or the
    /// policy table.
    pub async fn load_stale_allowed<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl: Option<Duration>,
    ) -> Option<StaleRead<T>> {
        let record = self.lookup::<T>(key).await.found()?;
        let ttl = ttl.unwrap_or_else(|| self.policy.ttl_for(key));
        let age_ms = record.age_ms(self.now_ms());
        let is_stale = age_ms >= duration_ms(ttl);
        debug!(key = key, age_ms, is_stale, "Cache hit");
        Some(StaleRead {
            data: record.data,
            is_stale,
            age_ms,
        })
    }

    /// Milliseconds since the entry was written.
    pub async fn age(&self, key: &str) -> Option<i64> {
        let store_key = key::namespaced(key);
        let raw = match self.store.get_item(&store_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read cache entry");
                return None;
            }
        };

        match record::decode_timestamp(&raw) {
            Decoded::Valid(timestamp) => Some(self.now_ms().saturating_sub(timestamp)),
            Decoded::Corrupt(reason) => {
                warn!(key = key, reason = %reason, "Removing corrupt cache entry");
                self.remove_quietly(&store_key).await;
                None
            }
        }
    }

    pub async fn has_valid(&self, key: &str) -> bool {
        self.load_strict::<Value>(key).await.is_some()
    }

    pub async fn has_any_valid<S: AsRef<str>>(&self, keys: &[S]) -> bool {
        for key in keys {
            if self.has_valid(key.as_ref()).await {
                return true;
            }
        }
        false
    }

    /// Age of the stalest entry among `keys`, i.e. the largest age.
    pub async fn oldest_age<S: AsRef<str>>(&self, keys: &[S]) -> Option<i64> {
        let mut oldest: Option<i64> = None;
        for key in keys {
            if let Some(age) = self.age(key.as_ref()).await {
                oldest = Some(oldest.map_or(age, |o| o.max(age)));
            }
        }
        oldest
    }

    pub async fn inspect(&self, key: &str) -> Option<EntryInfo> {
        let age_ms = self.age(key).await?;
        let ttl = self.policy.ttl_for(key);
        Some(EntryInfo {
            age_ms,
            ttl,
            is_stale: age_ms >= duration_ms(ttl),
        })
    }

    // ===== Invalidation =====

    /// Delete one key, or every key under a `prefix*` pattern.
    pub async fn invalidate(&self, pattern: &str) -> usize {
        self.invalidate_many([pattern]).await
    }

    /// Delete every entry selected by `patterns`. Returns how many stored
    /// entries were removed.
    pub async fn invalidate_many<I, S>(&self, patterns: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<KeyPattern> = patterns
            .into_iter()
            .map(|p| KeyPattern::parse(p.as_ref()))
            .collect();
        if patterns.is_empty() {
            return 0;
        }

        let targets: BTreeSet<String> = match self.store.all_keys().await {
            Ok(stored) => stored
                .into_iter()
                .filter(|k| patterns.iter().any(|p| p.matches_store_key(k)))
                .collect(),
            Err(e) => {
                // Exact keys can still be removed blind; wildcards cannot be resolved.
                warn!(error = %e, "Failed to list cache keys, invalidating exact keys only");
                patterns
                    .iter()
                    .filter_map(|p| match p {
                        KeyPattern::Exact(k) => Some(key::namespaced(k)),
                        KeyPattern::Prefix(_) => None,
                    })
                    .collect()
            }
        };

        self.remove_all(targets.into_iter().collect(), "invalidate").await
    }

    /// Delete every cache entry, leaving non-cache storage untouched.
    pub async fn clear_all(&self) -> usize {
        let targets: Vec<String> = match self.store.all_keys().await {
            Ok(stored) => stored.into_iter().filter(|k| key::is_namespaced(k)).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to list cache keys for clear");
                return 0;
            }
        };
        self.remove_all(targets, "clear").await
    }

    /// Flush the cache when the running app version differs from the one
    /// recorded at the previous start. Returns whether a flush happened.
    ///
    /// Must complete before any other cache read on startup.
    pub async fn check_and_clear_on_version_upgrade(&self, running: &str) -> bool {
        let stored = match self.store.get_item(VERSION_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to read stored app version");
                return false;
            }
        };

        match stored {
            Some(previous) if previous == running => false,
            Some(previous) => {
                let removed = self.clear_all().await;
                info!(from = %previous, to = %running, removed, "App version changed, cache cleared");
                self.write_version(running).await;
                true
            }
            None => {
                debug!(version = %running, "No stored app version, recording current");
                self.write_version(running).await;
                false
            }
        }
    }

    async fn write_version(&self, version: &str) {
        if let Err(e) = self.store.set_item(VERSION_KEY, version).await {
            warn!(error = %e, "Failed to record app version");
        }
    }

    async fn remove_all(&self, store_keys: Vec<String>, op: &str) -> usize {
        if store_keys.is_empty() {
            return 0;
        }
        let count = store_keys.len();
        match self.store.multi_remove(&store_keys).await {
            Ok(()) => {
                debug!(op = op, count, "Removed cache entries");
                count
            }
            Err(e) => {
                warn!(op = op, error = %e, "Failed to remove cache entries");
                0
            }
        }
    }

    async fn remove_quietly(&self, store_key: &str) {
        if let Err(e) = self.store.remove_item(store_key).await {
            warn!(key = store_key, error = %e, "Failed to remove cache entry");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
