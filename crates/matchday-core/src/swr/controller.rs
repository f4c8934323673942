use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::inflight::InFlight;
use super::state::SwrState;
use crate::cache::CacheManager;
use crate::context::CacheContext;
use crate::error::FetchError;
use crate::network::Connectivity;

/// Bounds for values served through SWR.
pub trait SwrData: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> SwrData for T where T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

pub type FetchFuture<T> = BoxFuture<'static, Result<T, FetchError>>;

/// Network source for one resource.
pub type FetchFn<T> = Arc<dyn Fn() -> FetchFuture<T> + Send + Sync>;

/// Wrap an async closure as a `FetchFn`.
pub fn fetcher<T, F, Fut>(f: F) -> FetchFn<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

pub struct SwrOptions<T> {
    pub key: String,
    pub fetch: FetchFn<T>,
    pub default_data: T,
    /// Overrides the policy table TTL for this resource
    pub ttl: Option<Duration>,
}

impl<T> SwrOptions<T> {
    pub fn new(key: impl Into<String>, fetch: FetchFn<T>, default_data: T) -> Self {
        Self {
            key: key.into(),
            fetch,
            default_data,
            ttl: None,
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// One stale-while-revalidate subscription.
///
/// Serves whatever the cache holds (even stale) as soon as `mount` runs,
/// then converges to fresh data with at most one background refresh in
/// flight. Dropping the handle or calling `unmount` stops all further state
/// updates; requests already started are not aborted, their results are
/// discarded.
pub struct SwrResource<T: SwrData> {
    inner: Arc<Inner<T>>,
}

struct Target<T> {
    key: String,
    fetch: FetchFn<T>,
}

struct Inner<T: SwrData> {
    cache: Arc<CacheManager>,
    connectivity: Arc<dyn Connectivity>,
    ttl: Option<Duration>,
    target: Mutex<Target<T>>,
    // Advanced on unmount and key change; results tagged with an older
    // epoch are dropped.
    epoch: AtomicU64,
    mounted: AtomicBool,
    state: watch::Sender<SwrState<T>>,
    refreshes: InFlight<T>,
}

impl<T: SwrData> SwrResource<T> {
    pub fn new(ctx: &CacheContext, options: SwrOptions<T>) -> Self {
        let (state, _) = watch::channel(SwrState::new(options.default_data));
        Self {
            inner: Arc::new(Inner {
                cache: Arc::clone(ctx.cache()),
                connectivity: Arc::clone(ctx.connectivity()),
                ttl: options.ttl,
                target: Mutex::new(Target {
                    key: options.key,
                    fetch: options.fetch,
                }),
                epoch: AtomicU64::new(0),
                mounted: AtomicBool::new(false),
                state,
                refreshes: InFlight::default(),
            }),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SwrState<T> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SwrState<T>> {
        self.inner.state.subscribe()
    }

    pub fn key(&self) -> String {
        self.inner.target().key.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    /// Whether a background refresh for the current key is outstanding
    pub fn refresh_in_flight(&self) -> bool {
        let key = self.key();
        self.inner.refreshes.is_pending(&key)
    }

    /// Serve from cache, then fetch in the foreground (miss) or background
    /// (stale hit). Calling it again while mounted re-runs the read.
    pub async fn mount(&self) {
        self.inner.mounted.store(true, Ordering::SeqCst);
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        Inner::revalidate(&self.inner, epoch).await;
    }

    /// Switch to another resource and load it as on mount.
    pub async fn change_key(&self, key: impl Into<String>, fetch: FetchFn<T>) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut target = self.inner.target();
            target.key = key.into();
            target.fetch = fetch;
        }
        self.inner.mounted.store(true, Ordering::SeqCst);
        Inner::revalidate(&self.inner, epoch).await;
    }

    /// Explicit user refresh: foreground fetch regardless of staleness.
    pub async fn refetch(&self) {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let (key, fetch) = self.inner.current();
        self.inner.apply(epoch, |s| s.loading = true);
        self.inner.foreground_fetch(epoch, &key, fetch).await;
    }

    pub fn unmount(&self) {
        self.inner.mounted.store(false, Ordering::SeqCst);
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: SwrData> Drop for SwrResource<T> {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl<T: SwrData> Inner<T> {
    fn target(&self) -> MutexGuard<'_, Target<T>> {
        self.target.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current(&self) -> (String, FetchFn<T>) {
        let target = self.target();
        (target.key.clone(), Arc::clone(&target.fetch))
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.mounted.load(Ordering::SeqCst) && self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Mutate state only if the operation started under `epoch` still owns
    /// this instance.
    fn apply(&self, epoch: u64, update: impl FnOnce(&mut SwrState<T>)) {
        if self.is_current(epoch) {
            self.state.send_modify(update);
        } else {
            debug!("Discarding state update from superseded operation");
        }
    }

    async fn revalidate(this: &Arc<Self>, epoch: u64) {
        let (key, fetch) = this.current();

        // A cache hit is served without ever flagging `loading`
        match this.cache.load_stale_allowed::<T>(&key, this.ttl).await {
            Some(hit) => {
                let last_updated = this.cache.now_ms().saturating_sub(hit.age_ms);
                let is_stale = hit.is_stale;
                this.apply(epoch, |s| {
                    s.data = hit.data;
                    s.is_stale = is_stale;
                    s.last_updated = Some(last_updated);
                    s.loading = false;
                });
                if is_stale && this.is_current(epoch) {
                    Self::start_background_refresh(this, epoch, key, fetch);
                }
            }
            None => {
                this.apply(epoch, |s| s.loading = true);
                this.foreground_fetch(epoch, &key, fetch).await
            }
        }
    }

    async fn foreground_fetch(&self, epoch: u64, key: &str, fetch: FetchFn<T>) {
        if !self.connectivity.is_online() {
            debug!(key = key, "Offline, skipping foreground fetch");
            self.apply(epoch, |s| {
                s.error = Some(FetchError::Offline.to_string());
                s.loading = false;
            });
            return;
        }

        match fetch().await {
            Ok(data) => {
                self.cache.save(key, &data).await;
                let now = self.cache.now_ms();
                self.apply(epoch, |s| {
                    s.data = data;
                    s.last_updated = Some(now);
                    s.is_stale = false;
                    s.loading = false;
                    s.error = None;
                });
            }
            Err(e) => {
                debug!(key = key, error = %e, "Foreground fetch failed");
                self.apply(epoch, |s| {
                    s.error = Some(e.to_string());
                    s.loading = false;
                });
            }
        }
    }

    fn start_background_refresh(this: &Arc<Self>, epoch: u64, key: String, fetch: FetchFn<T>) {
        if !this.connectivity.is_online() {
            debug!(key = %key, "Offline, keeping stale data");
            return;
        }

        let (request, started) = this.refreshes.join_or_start(&key, || fetch());
        if !started {
            debug!(key = %key, "Background refresh already in flight");
            return;
        }

        let inner = Arc::clone(this);
        tokio::spawn(async move {
            let result = request.await;
            inner.refreshes.finish(&key);
            match result {
                Ok(data) => {
                    inner.cache.save(&key, &data).await;
                    let now = inner.cache.now_ms();
                    inner.apply(epoch, |s| {
                        s.data = data;
                        s.last_updated = Some(now);
                        s.is_stale = false;
                        s.error = None;
                    });
                    debug!(key = %key, "Background refresh complete");
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Background refresh failed, keeping stale data");
                }
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
