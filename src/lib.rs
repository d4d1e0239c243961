//! API Cache - typed HTTP fetching with a persistent response cache
//!
//! Serves fresh cached responses without touching the network, falls back to
//! the network on a miss, expiry or stale-shaped payload, and stores what it
//! fetched under the resolved URL with a fixed TTL.

pub mod cache;
pub mod config;
pub mod error;
pub mod provider;
pub mod tasks;

pub use cache::{CacheStore, ClearMethod};
pub use config::Config;
pub use error::{FetchError, Result};
pub use provider::{ApiProvider, CachePolicy, FetchMethod, FetchOptions, QueryParams};
pub use tasks::spawn_cleanup_task;
