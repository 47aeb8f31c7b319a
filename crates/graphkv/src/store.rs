//! `Store`: the facade's handle over one partition's engines, wired
//! leaves-first (spec §2: Router → Engine → (Index, Relationship) →
//! Chunked KV → KV Backend).

use std::sync::Arc;

use graphkv_core::{
    blob::BlobStore,
    chunked::ChunkedKv,
    db::{backup::BackupEngine, entity::EntityEngine, index::IndexEngine, relation::RelationshipEngine},
    kv::KvBackend,
};

use crate::error::Result;

///
/// Store
/// One partition: one `KvBackend`, one `BlobStore`, and the four engines
/// built on top of them. Call [`Store::init`] once after construction to
/// load any index declarations already persisted in the backend before
/// serving reads or writes.
///

pub struct Store {
    index: Arc<IndexEngine>,
    relationships: Arc<RelationshipEngine>,
    entities: Arc<EntityEngine>,
    backup: Arc<BackupEngine>,
}

impl Store {
    #[must_use]
    pub fn new(backend: Arc<dyn KvBackend>, blobs: Arc<dyn BlobStore>, partition_id: impl Into<String>) -> Self {
        let kv = Arc::new(ChunkedKv::new(backend));
        let index = Arc::new(IndexEngine::new(Arc::clone(&kv)));
        let relationships = Arc::new(RelationshipEngine::new(Arc::clone(&kv)));
        let entities = Arc::new(EntityEngine::new(
            Arc::clone(&kv),
            Arc::clone(&index),
            Arc::clone(&relationships),
        ));
        let backup = Arc::new(BackupEngine::new(kv, blobs, partition_id));

        Self {
            index,
            relationships,
            entities,
            backup,
        }
    }

    /// Load the `idx:` prefix into the Index Engine's in-memory snapshot.
    /// Must run before the store serves any traffic that depends on
    /// declared indexes (expand-on-write, indexed reads).
    pub async fn init(&self) -> Result<()> {
        self.index.refresh().await.map_err(Into::into)
    }

    #[must_use]
    pub fn index(&self) -> &IndexEngine {
        &self.index
    }

    #[must_use]
    pub fn entities(&self) -> &EntityEngine {
        &self.entities
    }

    #[must_use]
    pub fn relationships(&self) -> &RelationshipEngine {
        &self.relationships
    }

    #[must_use]
    pub fn backup(&self) -> &BackupEngine {
        &self.backup
    }
}
