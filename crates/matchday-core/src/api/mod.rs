//! REST client for the club backend.
//!
//! `ApiClient` fetches resources as raw JSON and builds the fetch functions
//! that SWR resources and the startup preload consume.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
