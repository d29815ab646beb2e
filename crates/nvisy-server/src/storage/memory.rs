use std::sync::Arc;

use dashmap::DashMap;
use jiff::Timestamp;

use super::value::StorageValue;

/// A concurrent string-keyed map of [`StorageValue`]s.
///
/// Backed by [`DashMap`], which shards its internal locking so `Get`/`Set`
/// against different keys never contend. [`Storage::compare_and_remove`] is
/// the one operation that must be atomic with respect to a concurrent
/// `Set`: it only removes an entry if nothing has replaced it since it was
/// observed, which is what lets [`super::StorageCleaner`] sweep expired
/// entries without racing a session or cache refresh that just extended
/// one's lifetime.
#[derive(Default)]
pub struct Storage {
    entries: DashMap<String, StorageValue>,
}

impl Storage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the entry for `key`, if present, without checking
    /// expiration -- callers decide what "expired" means for their own
    /// purposes (a cache miss vs. a session restart).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<StorageValue> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Inserts or overwrites the entry for `key`.
    pub fn set(&self, key: impl Into<String>, value: StorageValue) {
        self.entries.insert(key.into(), value);
    }

    /// Unconditionally removes the entry for `key`.
    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Removes the entry for `key` only if it is still the exact entry
    /// `expected` -- identified by reference, not by value, since stored
    /// values are opaque. A concurrent `Set` that replaced the entry (even
    /// with an equal-looking value) makes this a no-op, returning `false`.
    #[must_use]
    pub fn compare_and_remove(&self, key: &str, expected: &StorageValue) -> bool {
        let mut removed = false;
        self.entries.remove_if(key, |_, current| {
            let matches = Arc::ptr_eq(current.value_arc(), expected.value_arc())
                && current.expires_at() == expected.expires_at();
            removed = matches;
            matches
        });
        removed
    }

    /// Returns every key currently stored, expired or not.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Returns whether every entry has been removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry whose `expiresAt` is no later than `now`,
    /// compare-and-removing each one so a concurrent `Set` wins the race.
    pub fn sweep_expired(&self, now: Timestamp) {
        for key in self.keys() {
            let Some(value) = self.get(&key) else { continue };
            if value.is_expired(now) {
                self.compare_and_remove(&key, &value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_none_for_a_missing_key() {
        let storage = Storage::new();
        assert!(storage.get("missing").is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let storage = Storage::new();
        storage.set("k", StorageValue::new(42_u32, Timestamp::now()));
        let value = storage.get("k").unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn compare_and_remove_fails_after_a_concurrent_set() {
        let storage = Storage::new();
        let first = StorageValue::new(1_u32, Timestamp::now());
        storage.set("k", first.clone());

        storage.set("k", StorageValue::new(2_u32, Timestamp::now()));

        assert!(!storage.compare_and_remove("k", &first));
        assert!(storage.get("k").is_some());
    }

    #[test]
    fn compare_and_remove_succeeds_against_the_untouched_entry() {
        let storage = Storage::new();
        let value = StorageValue::new(1_u32, Timestamp::now());
        storage.set("k", value.clone());

        assert!(storage.compare_and_remove("k", &value));
        assert!(storage.get("k").is_none());
    }

    #[test]
    fn sweep_expired_only_removes_past_entries() {
        let now = Timestamp::now();
        let storage = Storage::new();
        storage.set("expired", StorageValue::new((), now - std::time::Duration::from_secs(1)));
        storage.set("live", StorageValue::new((), now + std::time::Duration::from_secs(60)));

        storage.sweep_expired(now);

        assert!(storage.get("expired").is_none());
        assert!(storage.get("live").is_some());
    }
}
