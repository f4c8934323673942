//! Single-flight registry for background refreshes.
//!
//! Scoped to one SWR instance: two instances reading the same key each get
//! their own registry and may refresh independently.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::FetchError;

pub type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

pub struct InFlight<T> {
    pending: Mutex<HashMap<String, SharedFetch<T>>>,
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> InFlight<T> {
    /// Return the outstanding request for `key`, or start one with `start`.
    ///
    /// The boolean is `true` when this call started the request; that
    /// caller is responsible for calling `finish` once it resolves.
    pub fn join_or_start<F>(&self, key: &str, start: F) -> (SharedFetch<T>, bool)
    where
        F: FnOnce() -> BoxFuture<'static, Result<T, FetchError>>,
    {
        let mut pending = self.lock();
        if let Some(existing) = pending.get(key) {
            return (existing.clone(), false);
        }
        let shared = start().shared();
        pending.insert(key.to_string(), shared.clone());
        (shared, true)
    }

    pub fn finish(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The map is only touched in short non-panicking sections.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, SharedFetch<T>>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_second_caller_joins_first_request() {
        let registry: InFlight<u32> = InFlight::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let start = |calls: Arc<AtomicUsize>| {
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<u32, FetchError>(7) }.boxed()
            }
        };

        let (first, started) = registry.join_or_start("k", start(calls.clone()));
        assert!(started);
        let (second, started_again) = registry.join_or_start("k", start(calls.clone()));
        assert!(!started_again);
        assert!(registry.is_pending("k"));

        assert_eq!(first.await, Ok(7));
        assert_eq!(second.await, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        registry.finish("k");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let registry: InFlight<u32> = InFlight::default();
        let (_, a) = registry.join_or_start("a", || async { Ok::<u32, FetchError>(1) }.boxed());
        let (_, b) = registry.join_or_start("b", || async { Err::<u32, FetchError>(FetchError::Offline) }.boxed());
        assert!(a && b);
        assert_eq!(registry.len(), 2);
    }
}
