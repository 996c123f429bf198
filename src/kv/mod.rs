//! The kv module is the cache layer (`spec.md` §4.3): a single external key-value store holding
//! both client-facing lookups (profile JSON, base64 texture blobs, TTL'd) and scanner-owned
//! bookkeeping keys (`scanner:<uuid>`, `store:<uuid>`, TTL 0 — no expiry).

pub mod redis;
pub mod testing;

use crate::error::EdgeError;
use async_trait::async_trait;
use std::time::Duration;

/// [KvStore] is the read-through cache abstraction shared by the request handlers, the scanner
/// and the sign-up ingress. `ttl = None` stores the value with no expiry, used for the
/// scanner-owned `scanner:<uuid>` and `store:<uuid>` keys (`spec.md` §3 cache key invariants).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, EdgeError>;

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), EdgeError>;

    /// Returns whether `key` is present, without fetching its value. Used by the sign-up ingress
    /// which only ever needs to know that a marker exists.
    async fn exists(&self, key: &str) -> Result<bool, EdgeError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Cursor-based scan over keys matching `pattern`, page size `count` (`spec.md` §4.5: the
    /// scanner's non-priority producer sweeps `scanner:*`). Cursor `0` both starts and, once
    /// returned again, ends a full sweep.
    async fn scan(&self, pattern: &str, cursor: u64, count: u32) -> Result<(u64, Vec<String>), EdgeError>;
}

/// Builds the cache key for a raw profile lookup by uuid: the canonical hyphenated form, the same
/// string shape accepted at the boundary (`spec.md` §3: "cache keys use the same string form
/// verbatim").
pub fn profile_key(uuid: &uuid::Uuid) -> String {
    uuid.to_string()
}

/// Builds the cache key for a texture lookup by its hex texture id.
pub fn texture_key(texture_id: &str) -> String {
    texture_id.to_lowercase()
}

/// Builds the scanner bookkeeping key for a uuid.
pub fn scanner_key(uuid: &uuid::Uuid) -> String {
    format!("scanner:{uuid}")
}

/// Builds the sign-up marker key for a uuid.
pub fn store_key(uuid: &uuid::Uuid) -> String {
    format!("store:{uuid}")
}

#[cfg(test)]
mod test {
    use super::*;
    use uuid::uuid;

    #[test]
    fn profile_key_is_the_canonical_hyphenated_form() {
        let id = uuid!("09879557-e479-45a9-b434-a56377674627");
        assert_eq!("09879557-e479-45a9-b434-a56377674627", profile_key(&id));
        assert_eq!("abcd1234", texture_key("ABCD1234"));
    }

    #[test]
    fn scanner_and_store_keys_are_prefixed() {
        let id = uuid!("09879557-e479-45a9-b434-a56377674627");
        assert_eq!(
            "scanner:09879557-e479-45a9-b434-a56377674627",
            scanner_key(&id)
        );
        assert_eq!(
            "store:09879557-e479-45a9-b434-a56377674627",
            store_key(&id)
        );
    }
}
