//! Cache Entry Module
//!
//! Defines the stored response record and its freshness check.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A stored response: raw payload bytes plus creation time and TTL.
///
/// `created_at` and `ttl` are fixed at insertion. Expiry is never stored; it is
/// recomputed against the caller's `now` on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Canonical resolved URL
    pub key: String,
    /// Exact bytes returned by the transport
    pub payload: Vec<u8>,
    /// Insertion timestamp
    pub created_at: DateTime<Utc>,
    /// Time-to-live from `created_at`
    pub ttl: Duration,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with `now`.
    ///
    /// # Arguments
    /// * `key` - Canonical key (resolved URL)
    /// * `payload` - Raw response bytes
    /// * `ttl` - How long the entry stays fresh
    /// * `now` - Creation time, normally taken from the store's clock
    pub fn new(key: String, payload: Vec<u8>, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            key,
            payload,
            created_at: now,
            ttl,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is stale at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired(now, self.created_at, self.ttl)
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now)
    }

    /// Time elapsed since creation, clamped at zero if the clock went backwards.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.created_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    // == Time To Live ==
    /// Remaining freshness at `now`; zero once expired.
    pub fn ttl_remaining_at(&self, now: DateTime<Utc>) -> Duration {
        self.ttl.saturating_sub(self.age_at(now))
    }
}

// == Freshness ==
/// Pure freshness rule: expired iff `now - created_at > ttl`.
///
/// Boundary condition: at exactly `created_at + ttl` the entry is still fresh.
/// A TTL too large for chrono to represent never expires.
pub fn is_expired(now: DateTime<Utc>, created_at: DateTime<Utc>, ttl: Duration) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => now.signed_duration_since(created_at) > ttl,
        Err(_) => false,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn entry(ttl_secs: u64) -> CacheEntry {
        CacheEntry::new(
            "https://api.example.com/user".to_string(),
            b"123".to_vec(),
            Duration::from_secs(ttl_secs),
            t0(),
        )
    }

    #[test]
    fn test_entry_creation() {
        let entry = entry(10);

        assert_eq!(entry.key, "https://api.example.com/user");
        assert_eq!(entry.payload, b"123");
        assert_eq!(entry.created_at, t0());
        assert!(entry.is_fresh_at(t0()));
    }

    #[test]
    fn test_entry_expiration() {
        let entry = entry(10);

        assert!(!entry.is_expired_at(t0() + chrono::Duration::seconds(5)));
        assert!(entry.is_expired_at(t0() + chrono::Duration::seconds(15)));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = entry(10);

        assert!(!entry.is_expired_at(t0() + chrono::Duration::seconds(10)));
        assert!(entry.is_expired_at(t0() + chrono::Duration::milliseconds(10_001)));
    }

    #[test]
    fn test_zero_ttl_fresh_only_at_creation() {
        let entry = entry(0);

        assert!(entry.is_fresh_at(t0()));
        assert!(entry.is_expired_at(t0() + chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let entry = CacheEntry::new("k".to_string(), vec![], Duration::MAX, t0());
        assert!(entry.is_fresh_at(t0() + chrono::Duration::days(365 * 100)));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = entry(10);

        assert_eq!(
            entry.ttl_remaining_at(t0() + chrono::Duration::seconds(4)),
            Duration::from_secs(6)
        );
        assert_eq!(
            entry.ttl_remaining_at(t0() + chrono::Duration::seconds(40)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_age_clamped_when_clock_goes_backwards() {
        let entry = entry(10);
        assert_eq!(entry.age_at(t0() - chrono::Duration::seconds(3)), Duration::ZERO);
    }
}
