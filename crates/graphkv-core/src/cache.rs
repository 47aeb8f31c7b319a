//! Read Cache (spec §4.2).
//!
//! A single in-memory mapping from encoded key to last-observed value. No
//! eviction, no TTL: the scope of a cache is one store partition and its
//! lifetime matches the hosting process. Coherence rests entirely on the
//! rule enforced by every mutating engine operation — invalidate before
//! you write (spec §5, "cache invalidation happens before the write is
//! issued").
//!
//! The cache is intentionally coarse: `invalidate_all` drops every entry
//! rather than reasoning about which prefixes a write could have touched.
//! Fine-grained invalidation would cut thrash on mixed read/write
//! workloads, but the cross-subsystem key fan-out (one entity write can
//! touch N index rows) makes "what did this write touch" expensive to
//! compute precisely — the blanket rule is pessimistic but cannot be wrong.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

use crate::value::Value;

///
/// ReadCache
/// Single-level read-through cache keyed by encoded storage key.
///

#[derive(Default)]
pub struct ReadCache {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl ReadCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: String, value: Value) {
        self.entries.write().await.insert(key, value);
    }

    /// Drop every cached entry. Called by every mutating operation before
    /// it issues KV writes (spec §4.2, §5).
    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
    }
}
