//! TTL Cache
//!
//! Process-local, best-effort cache for content-store projections. Entries
//! are idempotent snapshots of upstream truth, so concurrent writers of the
//! same key resolve as last write wins and staleness is bounded by the TTL.
//! Never a source of truth; losing it on restart is fine.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Cache with a fixed time-to-live per entry.
///
/// A zero TTL disables storage entirely, which is the no-op variant used by
/// tests that need every lookup to hit the network.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a live entry. Expired entries read as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().unwrap();
        match entries.get(key) {
            Some((expires, value)) if *expires > Instant::now() => Some(value.clone()),
            _ => None,
        }
    }

    /// Insert or overwrite an entry. Expired entries are pruned on the way in
    /// so the map stays bounded by the live working set.
    pub fn set(&self, key: &str, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap();
        entries.retain(|_, (expires, _)| *expires > now);
        entries.insert(key.to_string(), (now + self.ttl, value));
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("k", 7);
        assert_eq!(cache.get("k"), Some(7));
    }

    #[test]
    fn test_entry_expires() {
        let cache = TtlCache::new(Duration::from_millis(10));
        cache.set("k", 7);
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_zero_ttl_never_stores() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.set("k", 7);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_overwrite_wins() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("k", 1);
        cache.set("k", 2);
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn test_clear_empties() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear();
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
    }
}
