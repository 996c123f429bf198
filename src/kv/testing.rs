//! [MemoryKvStore] is an in-memory [KvStore] fake used by unit and integration tests in place of
//! a real Redis instance.

use crate::error::EdgeError;
use crate::kv::KvStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A trivial in-memory store. TTLs are recorded but not enforced (`spec.md`'s testable scenarios
/// only assert presence/absence and change-detection, never actual expiry timing).
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries currently stored, for assertions in tests.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, EdgeError> {
        Ok(self.entries.lock().expect("lock poisoned").get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str, _ttl: Option<Duration>) -> Result<(), EdgeError> {
        self.entries
            .lock()
            .expect("lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Matches only the `prefix*` shape the scanner actually uses. Returns everything in one page
    /// (cursor `0`), since the in-memory fake has no reason to model Redis's incremental cursor.
    async fn scan(&self, pattern: &str, _cursor: u64, _count: u32) -> Result<(u64, Vec<String>), EdgeError> {
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        let keys = self
            .entries
            .lock()
            .expect("lock poisoned")
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        Ok((0, keys))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_value() {
        // given
        let store = MemoryKvStore::new();

        // when
        store.put("k", "v", None).await.unwrap();
        let got = store.get("k").await.unwrap();

        // then
        assert_eq!(Some("v".to_string()), got);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = MemoryKvStore::new();
        assert_eq!(None, store.get("missing").await.unwrap());
    }

    #[tokio::test]
    async fn exists_reflects_presence() {
        let store = MemoryKvStore::new();
        assert!(!store.exists("k").await.unwrap());
        store.put("k", "v", None).await.unwrap();
        assert!(store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn scan_matches_prefix_only() {
        let store = MemoryKvStore::new();
        store.put("scanner:a", "1", None).await.unwrap();
        store.put("scanner:b", "2", None).await.unwrap();
        store.put("profile:c", "3", None).await.unwrap();

        let (cursor, mut keys) = store.scan("scanner:*", 0, 128).await.unwrap();
        keys.sort();

        assert_eq!(0, cursor);
        assert_eq!(vec!["scanner:a", "scanner:b"], keys);
    }
}
