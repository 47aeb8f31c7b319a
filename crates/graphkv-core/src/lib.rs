//! Engine internals for graphkv: chunked KV, read cache, the index,
//! relationship, entity, and backup/restore engines, and the `KvBackend`/
//! `BlobStore` collaborator traits. Not a stable public API — the
//! `graphkv` facade crate is the intended entry point.

pub mod blob;
pub mod cache;
pub mod chunked;
pub mod db;
pub mod error;
pub mod key;
pub mod kv;
pub mod pagination;
pub mod value;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

/// Common imports for engine call sites.
pub mod prelude {
    pub use crate::{
        blob::BlobStore,
        chunked::ChunkedKv,
        db::{
            backup::{BackupEngine, RestoreOutcome},
            entity::{EntityEngine, EntityPage, ListRequest as EntityListRequest, RangePredicate},
            index::{IndexDecl, IndexEngine},
            relation::{
                CreateEdge, ListRequest as RelationshipListRequest, RelationshipEngine, RemoveEdge,
            },
        },
        error::{ErrorClass, ErrorOrigin, InternalError, Result},
        kv::{KvBackend, TxnOp, MAX_BATCH_KEYS},
        pagination::{Page, PageArgs},
        value::{EntityMap, Value},
    };
}
