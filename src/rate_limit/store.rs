use dashmap::DashMap;

/// Outcome of counting one request against a key's window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u64,
    /// Requests counted in the current window, this one included when allowed
    pub count: u64,
    pub remaining: u64,
    /// Epoch millis at which the current window closes
    pub reset_at_ms: u64,
}

/// Per-key fixed-window counters
pub trait RateLimitStore: Send + Sync {
    /// Count a request for `key` unless the window is already full
    fn hit(&self, key: &str, now_ms: u64, window_ms: u64, max: u64) -> Decision;

    /// Drop windows that closed at or before `now_ms`; returns how many
    fn purge_expired(&self, now_ms: u64) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    reset_at_ms: u64,
    count: u64,
}

/// In-process store
///
/// Each hit holds the key's shard lock for the whole read-modify-write, so
/// concurrent requests for one key never push the count past `max`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    windows: DashMap<String, Window>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl RateLimitStore for MemoryStore {
    fn hit(&self, key: &str, now_ms: u64, window_ms: u64, max: u64) -> Decision {
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            reset_at_ms: now_ms + window_ms,
            count: 0,
        });

        if now_ms >= window.reset_at_ms {
            window.reset_at_ms = now_ms + window_ms;
            window.count = 0;
        }

        let allowed = window.count < max;
        if allowed {
            window.count += 1;
        }

        Decision {
            allowed,
            limit: max,
            count: window.count,
            remaining: max.saturating_sub(window.count),
            reset_at_ms: window.reset_at_ms,
        }
    }

    fn purge_expired(&self, now_ms: u64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| window.reset_at_ms > now_ms);
        before.saturating_sub(self.windows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_until_full() {
        let store = MemoryStore::new();
        for expected in 1..=3 {
            let d = store.hit("a", 0, 1_000, 3);
            assert!(d.allowed);
            assert_eq!(d.count, expected);
            assert_eq!(d.remaining, 3 - expected);
        }

        let d = store.hit("a", 10, 1_000, 3);
        assert!(!d.allowed);
        assert_eq!(d.count, 3);
        assert_eq!(d.remaining, 0);
        assert_eq!(d.reset_at_ms, 1_000);
    }

    #[test]
    fn test_window_rolls_over() {
        let store = MemoryStore::new();
        store.hit("a", 0, 1_000, 1);
        assert!(!store.hit("a", 999, 1_000, 1).allowed);

        let d = store.hit("a", 1_000, 1_000, 1);
        assert!(d.allowed);
        assert_eq!(d.reset_at_ms, 2_000);
    }

    #[test]
    fn test_keys_are_independent() {
        let store = MemoryStore::new();
        assert!(store.hit("a", 0, 1_000, 1).allowed);
        assert!(store.hit("b", 0, 1_000, 1).allowed);
        assert!(!store.hit("a", 0, 1_000, 1).allowed);
    }

    #[test]
    fn test_purge_expired() {
        let store = MemoryStore::new();
        store.hit("old", 0, 1_000, 5);
        store.hit("new", 900, 1_000, 5);

        assert_eq!(store.purge_expired(1_000), 1);
        assert_eq!(store.len(), 1);

        assert_eq!(store.purge_expired(1_900), 1);
        assert!(store.is_empty());
    }
}
