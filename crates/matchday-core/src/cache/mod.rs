//! Persistent caching for offline data access.
//!
//! `CacheManager` stores every resource as a JSON envelope
//! `{"data": ..., "timestamp": <epoch ms>}` under a `cache_`-prefixed key.
//! Freshness is decided per resource by the `TtlPolicy` table:
//! - Teams, seasons, competitions: 24h
//! - Fixtures calendar: 15 minutes
//! - Results: 10 minutes
//! - Standings, rosters, players: 30 minutes

pub mod key;
pub mod manager;
pub mod policy;
pub mod record;

pub use key::{CacheKey, KeyPattern};
pub use manager::{CacheManager, EntryInfo, Lookup, StaleRead, LEGACY_EXPIRY};
pub use policy::TtlPolicy;
pub use record::{describe_age, CacheRecord};
