//! graphkv: an embedded, graph-shaped key-value store. Entities live in a
//! flat KV namespace alongside their secondary-index rows and bidirectional
//! relationship edges; a read-through cache sits in front of every read,
//! invalidated wholesale before every write.
//!
//! [`Store`] is the entry point: wire a [`graphkv_core::kv::KvBackend`] and
//! a [`graphkv_core::blob::BlobStore`] into one, call [`Store::init`], then
//! either call the engines directly (`store.entities()`, `store.index()`,
//! `store.relationships()`, `store.backup()`) or dispatch whole requests
//! through [`Router`].

pub mod error;
pub mod request;
pub mod response;
pub mod router;
pub mod store;

pub use error::Error;
pub use router::Router;
pub use store::Store;

/// Common imports for callers of this crate.
pub mod prelude {
    pub use crate::{
        error::{Error, ErrorClass, ErrorOrigin, Result},
        request::{
            IndexOp, QueryOp, RangePredicateDto, RelationshipCreateDto, RelationshipListDto,
            RelationshipOp, RelationshipRemoveDto, Request, StoreOp,
        },
        response::Response,
        router::Router,
        store::Store,
    };
    pub use graphkv_core::value::{EntityMap, Value};
}
