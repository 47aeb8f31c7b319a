//! The `KvBackend` trait: the external collaborator's interface (spec §2,
//! "KV Backend (external)"). The core engine never assumes a concrete
//! backend — it only ever calls through this trait, batched through
//! [`crate::chunked::ChunkedKv`].
//!
//! A single partition's backend must support ordered prefix listing and a
//! single-partition transaction that applies a batch of puts/deletes
//! atomically. Everything above 128 keys in one call is the caller's
//! problem to chunk (that's `ChunkedKv`'s whole job).

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{error::Result, value::Value};

/// Hard cap on keys per batched get/put/delete call, shared by every
/// backend implementation (spec §2).
pub const MAX_BATCH_KEYS: usize = 128;

/// One write planned inside a [`KvBackend::transaction`] call.
#[derive(Clone, Debug)]
pub enum TxnOp {
    Put(String, Value),
    Delete(String),
}

/// Ordered key-value store with single-partition transactions and prefix
/// listing. Implementations are expected to be cheap to clone/share (e.g.
/// an `Arc`-wrapped handle) since the engine holds one for its lifetime.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Fetch a batch of keys (at most [`MAX_BATCH_KEYS`]). Keys absent from
    /// the backend are simply absent from the returned map — "missing key
    /// ⇒ undefined" per spec §4.1.
    async fn get_many(&self, keys: &[String]) -> Result<BTreeMap<String, Value>>;

    /// Write a batch of entries (at most [`MAX_BATCH_KEYS`]), non-atomically
    /// across the whole call (chunking is handled one level up).
    async fn put_many(&self, entries: Vec<(String, Value)>) -> Result<()>;

    /// Delete a batch of keys (at most [`MAX_BATCH_KEYS`]).
    async fn delete_many(&self, keys: &[String]) -> Result<()>;

    /// List every key (and value) with the given prefix, in key order.
    async fn list_prefix(&self, prefix: &str) -> Result<BTreeMap<String, Value>>;

    /// Apply a batch of writes atomically. Used for the transactional
    /// boundaries spec §5 calls out: single-edge create/remove,
    /// single-entity create/update (including index fan-out and dangling
    /// delete).
    async fn transaction(&self, ops: Vec<TxnOp>) -> Result<()>;

    /// Delete every key in the partition. Used by `purgeAllQuery` and by
    /// the safety-backup-then-purge step of restore.
    async fn purge_all(&self) -> Result<()>;

    /// Full KV image, for backup serialization.
    async fn snapshot(&self) -> Result<BTreeMap<String, Value>>;
}
