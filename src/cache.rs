//! Cache primitives shared by the spend-sheet layer: an injectable clock, a
//! timestamped cache entry, and the freshness stamp that the credential and
//! sheet-metadata caches share.

use chrono::{DateTime, Duration, Utc};
use std::fmt::Debug;
use std::sync::Mutex;

/// How long a cached sheet, sheet-name list, or access token stays valid.
pub(crate) const CACHE_TTL_MINUTES: i64 = 30;

pub(crate) fn cache_ttl() -> Duration {
    Duration::minutes(CACHE_TTL_MINUTES)
}

/// A source of "now". Injected everywhere expiry or calendar-day decisions are
/// made so that TTL boundaries and day rollover are testable.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The production clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A value with the time it was fetched from the provider.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<T> {
    value: T,
    fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub(crate) fn new(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self { value, fetched_at }
    }

    pub(crate) fn value(&self) -> &T {
        &self.value
    }

    /// True while `now - fetched_at < ttl`.
    pub(crate) fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

/// The "last authorized at" timestamp shared between the credential cache and
/// the sheet-name cache. Both update it when they go to the provider, and the
/// sheet-name cache keys its expiry off it.
#[derive(Debug, Default)]
pub(crate) struct FreshnessStamp {
    last_authorized_at: Mutex<Option<DateTime<Utc>>>,
}

impl FreshnessStamp {
    pub(crate) fn touch(&self, now: DateTime<Utc>) {
        *self.last_authorized_at.lock().unwrap() = Some(now);
    }

    pub(crate) fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match *self.last_authorized_at.lock().unwrap() {
            Some(at) => now - at < ttl,
            None => false,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_clock::ManualClock;
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn entry_is_fresh_before_ttl() {
        let clock = ManualClock::new(start());
        let entry = CacheEntry::new("rows", clock.now());
        clock.advance(Duration::minutes(29));
        assert!(entry.is_fresh(clock.now(), cache_ttl()));
    }

    #[test]
    fn entry_is_stale_after_ttl() {
        let clock = ManualClock::new(start());
        let entry = CacheEntry::new("rows", clock.now());
        clock.advance(Duration::minutes(31));
        assert!(!entry.is_fresh(clock.now(), cache_ttl()));
    }

    #[test]
    fn entry_is_stale_at_exact_ttl() {
        let clock = ManualClock::new(start());
        let entry = CacheEntry::new("rows", clock.now());
        clock.advance(Duration::minutes(CACHE_TTL_MINUTES));
        assert!(!entry.is_fresh(clock.now(), cache_ttl()));
    }

    #[test]
    fn stamp_starts_stale_and_freshens_on_touch() {
        let clock = ManualClock::new(start());
        let stamp = FreshnessStamp::default();
        assert!(!stamp.is_fresh(clock.now(), cache_ttl()));
        stamp.touch(clock.now());
        clock.advance(Duration::minutes(10));
        assert!(stamp.is_fresh(clock.now(), cache_ttl()));
        clock.advance(Duration::minutes(25));
        assert!(!stamp.is_fresh(clock.now(), cache_ttl()));
    }
}
