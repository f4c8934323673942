//! Offline-first data layer for the matchday club app.
//!
//! Screens render straight from a persistent cache and converge to fresh
//! backend data in the background (stale-while-revalidate). The pieces:
//!
//! - `store`: async key-value storage (`MemoryStore`, `FileStore`)
//! - `cache`: record codec, TTL policy table and the `CacheManager`
//! - `swr`: per-resource stale-while-revalidate subscriptions
//! - `preload`: concurrent start-up population of the cache
//! - `context`: the injected root tying the above together
//! - `api`, `resources`: the club backend as a source of fetch functions

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod network;
pub mod preload;
pub mod resources;
pub mod store;
pub mod swr;

pub use api::{ApiClient, ApiError};
pub use cache::{CacheKey, CacheManager, EntryInfo, Lookup, StaleRead, TtlPolicy};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use context::{CacheContext, ContextBuilder};
pub use error::{FetchError, StoreError};
pub use network::{AlwaysOnline, Connectivity, NetworkStatus};
pub use preload::{PreloadOrchestrator, PreloadReport};
pub use resources::Resource;
pub use store::{FileStore, KvStore, MemoryStore};
pub use swr::{fetcher, FetchFn, SwrOptions, SwrResource, SwrState};
