//! Stale-while-revalidate resources.
//!
//! A `SwrResource` renders instantly from whatever the cache holds and
//! converges to fresh data in the background, surfacing a loading flag only
//! when there is nothing to show or the user asked for a refresh.

pub mod controller;
pub mod inflight;
pub mod state;

pub use controller::{fetcher, FetchFn, FetchFuture, SwrData, SwrOptions, SwrResource};
pub use inflight::InFlight;
pub use state::SwrState;
