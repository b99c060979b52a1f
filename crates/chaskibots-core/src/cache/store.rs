use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, trace};

/// TTL used by `set_default` when a resource does not name its own.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// TTL key-value cache shared by all request handlers.
///
/// Values of any `Clone + Send + Sync` type can be stored; `get` returns
/// `None` both for missing/expired keys and for a stored value of a
/// different type. Concurrent `set`s on one key are last-write-wins.
/// There is no size bound, entries only leave through expiry or
/// invalidation.
pub struct Cache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Cache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if entry.is_expired(now) {
            drop(entry);
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            trace!(key = key, "Cache entry expired");
            return None;
        }

        let value = entry.value.downcast_ref::<T>().cloned();
        if value.is_none() {
            debug!(key = key, "Cached value has a different type, treating as miss");
        }
        value
    }

    pub fn set<T>(&self, key: impl Into<String>, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        let entry = CacheEntry {
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.into(), entry);
    }

    pub fn set_default<T>(&self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.set(key, value, self.default_ttl);
    }

    /// Remove every entry whose key starts with `prefix`.
    /// Returns how many entries were removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before.saturating_sub(self.entries.len());
        debug!(prefix = prefix, removed = removed, "Invalidated cache entries");
        removed
    }

    /// Drop expired entries eagerly.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
