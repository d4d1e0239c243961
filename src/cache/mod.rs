//! Cache Module
//!
//! Persistent response cache with fixed-TTL expiration.

mod clock;
mod entry;
mod persist;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{is_expired, CacheEntry};
pub use shared::{init_shared, open_shared, reset_shared, shared};
pub use stats::CacheStats;
pub use store::{CacheStore, ClearMethod};

pub(crate) use stats::StatsRecorder;
