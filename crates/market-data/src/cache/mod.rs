//! In-memory TTL caching with an injectable clock.
//!
//! Entries are never proactively evicted: staleness is checked lazily on
//! read, and a stale entry is recomputed and overwritten by the caller,
//! never merged with its predecessor. The clock is injected so tests can
//! drive expiry deterministically.

use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests.
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A cached value plus its capture instant.
#[derive(Clone, Debug)]
pub struct CacheEntry<T> {
    pub value: T,
    pub captured_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, captured_at: Instant) -> Self {
        Self { value, captured_at }
    }

    /// Valid while `now - captured_at < ttl`.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.captured_at) < ttl
    }
}

/// Keyed TTL cache with atomic whole-entry replacement.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create a cache with the given TTL on the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a cache with the given TTL and clock.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    /// Return the cached value if present and fresh.
    ///
    /// A stale entry is left in place; the caller recomputes and the next
    /// `insert` overwrites it.
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.is_fresh(self.clock.now(), self.ttl) {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Store a value with the current capture timestamp, replacing any
    /// previous entry for the key.
    pub fn insert(&self, key: K, value: V) {
        self.entries
            .insert(key, CacheEntry::new(value, self.clock.now()));
    }

    /// Number of entries held, fresh or stale.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_fresh_entry() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("BASF".to_string(), 7);
        assert_eq!(cache.get(&"BASF".to_string()), Some(7));
    }

    #[test]
    fn test_miss_on_unknown_key() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(&"SAP".to_string()), None);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache: TtlCache<String, u32> =
            TtlCache::with_clock(Duration::from_secs(120), clock.clone());

        cache.insert("BASF".to_string(), 7);
        clock.advance(Duration::from_secs(119));
        assert_eq!(cache.get(&"BASF".to_string()), Some(7));

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get(&"BASF".to_string()), None);
        // Stale entry stays until overwritten
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insert_overwrites_stale_entry() {
        let clock = Arc::new(ManualClock::new());
        let cache: TtlCache<String, u32> =
            TtlCache::with_clock(Duration::from_secs(120), clock.clone());

        cache.insert("BASF".to_string(), 7);
        clock.advance(Duration::from_secs(200));
        assert_eq!(cache.get(&"BASF".to_string()), None);

        cache.insert("BASF".to_string(), 9);
        assert_eq!(cache.get(&"BASF".to_string()), Some(9));
        assert_eq!(cache.len(), 1);
    }
}
