//! Chunked KV (spec §4.1).
//!
//! Wraps a [`KvBackend`] to split any multi-key get/put/delete into
//! `MAX_BATCH_KEYS`-sized chunks, executed concurrently, and integrates the
//! [`ReadCache`] on reads. This is the only thing above the backend that the
//! rest of the engine talks to.
//!
//! Chunks are concurrent awaitables, not atomicity boundaries (spec §9,
//! "chunked atomicity" open question): a batch write that spans chunk
//! boundaries can partially fail, leaving later chunks unwritten while
//! earlier ones landed. Operations that must be atomic go through
//! [`KvBackend::transaction`] directly instead of through this type.

use std::{collections::BTreeMap, sync::Arc};

use futures::future::try_join_all;

use crate::{
    cache::ReadCache,
    error::Result,
    kv::{KvBackend, TxnOp, MAX_BATCH_KEYS},
    value::Value,
};

///
/// ChunkedKv
/// Batch-oriented facade over one [`KvBackend`], cache-aware on reads.
///

pub struct ChunkedKv {
    backend: Arc<dyn KvBackend>,
    cache: ReadCache,
}

impl ChunkedKv {
    #[must_use]
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            cache: ReadCache::new(),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &ReadCache {
        &self.cache
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }

    /// Fetch every key, cache-first. Cache misses are batched (chunked,
    /// concurrent) against the backend and the fetched values are written
    /// back into the cache. Missing keys are simply absent from the
    /// result map — "missing key ⇒ undefined" (spec §4.1).
    pub async fn get_many(&self, keys: &[String]) -> Result<BTreeMap<String, Value>> {
        if keys.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut result = BTreeMap::new();
        let mut misses = Vec::new();
        for key in keys {
            match self.cache.get(key).await {
                Some(value) => {
                    result.insert(key.clone(), value);
                }
                None => misses.push(key.clone()),
            }
        }

        if misses.is_empty() {
            return Ok(result);
        }

        let chunks: Vec<Vec<String>> = misses
            .chunks(MAX_BATCH_KEYS)
            .map(<[String]>::to_vec)
            .collect();
        tracing::debug!(misses = misses.len(), chunks = chunks.len(), "cache miss, fanning out to backend");

        let fetched = try_join_all(chunks.into_iter().map(|chunk| {
            let backend = Arc::clone(&self.backend);
            async move { backend.get_many(&chunk).await }
        }))
        .await?;

        for chunk_result in fetched {
            for (key, value) in chunk_result {
                self.cache.set(key.clone(), value.clone()).await;
                result.insert(key, value);
            }
        }

        Ok(result)
    }

    /// Write a batch of entries. Invalidates the entire cache before
    /// touching the backend (spec §4.1, §4.2) so no reader can observe a
    /// pre-write value once this call has started.
    pub async fn put_many(&self, entries: Vec<(String, Value)>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        tracing::debug!(entries = entries.len(), "invalidating cache before put_many");
        self.cache.invalidate_all().await;

        let chunks: Vec<Vec<(String, Value)>> = entries
            .chunks(MAX_BATCH_KEYS)
            .map(<[(String, Value)]>::to_vec)
            .collect();

        try_join_all(chunks.into_iter().map(|chunk| {
            let backend = Arc::clone(&self.backend);
            async move { backend.put_many(chunk).await }
        }))
        .await?;

        Ok(())
    }

    /// Delete a batch of keys. Invalidates the entire cache before touching
    /// the backend, same rule as `put_many`.
    pub async fn delete_many(&self, keys: Vec<String>) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        tracing::debug!(keys = keys.len(), "invalidating cache before delete_many");
        self.cache.invalidate_all().await;

        let chunks: Vec<Vec<String>> = keys.chunks(MAX_BATCH_KEYS).map(<[String]>::to_vec).collect();

        try_join_all(chunks.into_iter().map(|chunk| {
            let backend = Arc::clone(&self.backend);
            async move { backend.delete_many(&chunk).await }
        }))
        .await?;

        Ok(())
    }

    /// Apply a batch of writes atomically via the backend's transaction
    /// support (spec §5's transactional boundaries: single-edge
    /// create/remove, single-entity create/update with index fan-out).
    /// Invalidates the cache before dispatch, same rule as `put_many`.
    pub async fn transaction(&self, ops: Vec<TxnOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        tracing::debug!(ops = ops.len(), "invalidating cache before transaction");
        self.cache.invalidate_all().await;
        self.backend.transaction(ops).await
    }

    /// List every key with the given prefix. Not cached at this layer —
    /// the entity engine caches full, unfiltered prefix listings itself
    /// (spec §4.5 listQuery) because only *that* layer knows whether a
    /// given listing is cursor-free and predicate-free.
    pub async fn list_prefix(&self, prefix: &str) -> Result<BTreeMap<String, Value>> {
        self.backend.list_prefix(prefix).await
    }

    /// Delete every key in the partition, invalidating the cache first.
    /// Used by `purgeAllQuery` (spec §4.5) and by restore's pre-purge step
    /// (spec §4.6).
    pub async fn purge_all(&self) -> Result<()> {
        self.cache.invalidate_all().await;
        self.backend.purge_all().await
    }

    /// Full KV image, for backup serialization (spec §4.6).
    pub async fn snapshot(&self) -> Result<BTreeMap<String, Value>> {
        self.backend.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::memory_kv::MemoryKvBackend;

    fn chunked() -> ChunkedKv {
        ChunkedKv::new(Arc::new(MemoryKvBackend::new()))
    }

    #[tokio::test]
    async fn empty_input_is_a_no_op() {
        let kv = chunked();
        assert_eq!(kv.get_many(&[]).await.unwrap(), BTreeMap::new());
        kv.put_many(vec![]).await.unwrap();
        kv.delete_many(vec![]).await.unwrap();
    }

    #[tokio::test]
    async fn chunking_at_exactly_128_and_129_keys_both_complete() {
        for count in [128usize, 129] {
            let kv = chunked();
            let entries: Vec<(String, Value)> = (0..count)
                .map(|i| (format!("key-{i}"), Value::from(i as f64)))
                .collect();
            kv.put_many(entries.clone()).await.unwrap();

            let keys: Vec<String> = entries.iter().map(|(k, _)| k.clone()).collect();
            let fetched = kv.get_many(&keys).await.unwrap();
            assert_eq!(fetched.len(), count);
            for (k, v) in &entries {
                assert_eq!(fetched.get(k), Some(v));
            }
        }
    }

    #[tokio::test]
    async fn put_invalidates_previously_cached_reads() {
        let kv = chunked();
        kv.put_many(vec![("a".into(), Value::from("1"))])
            .await
            .unwrap();
        let _ = kv.get_many(&["a".into()]).await.unwrap();

        kv.put_many(vec![("a".into(), Value::from("2"))])
            .await
            .unwrap();
        let fetched = kv.get_many(&["a".into()]).await.unwrap();
        assert_eq!(fetched.get("a"), Some(&Value::from("2")));
    }
}
