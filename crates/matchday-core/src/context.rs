//! Process-wide cache wiring.
//!
//! A `CacheContext` is built once at start-up and handed to every consumer
//! (SWR resources, preload, inspection tooling). Opening it runs the
//! version-upgrade check, so a context in hand guarantees that stale-format
//! data from a previous app version is already gone.

use std::sync::Arc;

use tracing::info;

use crate::cache::{CacheManager, TtlPolicy};
use crate::clock::{Clock, SystemClock};
use crate::network::{AlwaysOnline, Connectivity};
use crate::store::KvStore;
use crate::swr::{SwrData, SwrOptions, SwrResource};

/// Version recorded in storage when none is configured
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct CacheContext {
    cache: Arc<CacheManager>,
    connectivity: Arc<dyn Connectivity>,
    app_version: String,
    flushed_on_open: bool,
}

impl CacheContext {
    pub fn builder(store: Arc<dyn KvStore>) -> ContextBuilder {
        ContextBuilder {
            store,
            policy: TtlPolicy::default(),
            clock: Arc::new(SystemClock),
            connectivity: Arc::new(AlwaysOnline),
            app_version: CRATE_VERSION.to_string(),
        }
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn connectivity(&self) -> &Arc<dyn Connectivity> {
        &self.connectivity
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    /// Whether opening this context wiped the cache after an upgrade.
    pub fn flushed_on_open(&self) -> bool {
        self.flushed_on_open
    }

    /// Create an SWR resource bound to this context. Call `mount` on it to
    /// start loading.
    pub fn swr<T: SwrData>(&self, options: SwrOptions<T>) -> SwrResource<T> {
        SwrResource::new(self, options)
    }
}

pub struct ContextBuilder {
    store: Arc<dyn KvStore>,
    policy: TtlPolicy,
    clock: Arc<dyn Clock>,
    connectivity: Arc<dyn Connectivity>,
    app_version: String,
}

impl ContextBuilder {
    pub fn policy(mut self, policy: TtlPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    /// Build the context, flushing the cache first if the app version changed.
    pub async fn open(self) -> CacheContext {
        let cache = Arc::new(CacheManager::new(self.store, self.policy, self.clock));
        let flushed_on_open = cache
            .check_and_clear_on_version_upgrade(&self.app_version)
            .await;
        info!(version = %self.app_version, flushed = flushed_on_open, "Cache context ready");

        CacheContext {
            cache,
            connectivity: self.connectivity,
            app_version: self.app_version,
            flushed_on_open,
        }
    }
}
