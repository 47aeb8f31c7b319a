//! The dispatch envelope (spec §6): a tagged union routed by `(type,
//! operation)` to the matching engine method — nested sum types, not
//! reflection. Every body derives `Serialize`/`Deserialize` so the envelope
//! is JSON-compatible for the (external, unimplemented) HTTP transport.

use std::collections::BTreeMap;

use graphkv_core::value::{EntityMap, Value};
use serde::{Deserialize, Serialize};

///
/// Request
/// `{ type, operation, request, tag? }` collapsed onto Rust's type system:
/// `type` and `operation` together select one variant of one nested enum.
/// `tag` (an opaque caller-supplied correlation id) is carried alongside
/// for transports that want it; the engine never inspects it.
///

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    Index(IndexOp),
    Query(QueryOp),
    Relationship(RelationshipOp),
    Store(StoreOp),
    /// External echo endpoint (spec §1 scope) — kept so the envelope shape
    /// is complete; carries no engine logic. A struct variant, not a
    /// newtype, because internally tagged enums can only flatten structs
    /// and maps, not bare scalars.
    Diagnostic { echo: String },
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum IndexOp {
    Create { property: String },
    Read { id: String },
    Update { id: String, property: String },
    Remove { id: String },
    List,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RangePredicateDto {
    pub property: String,
    pub min: Value,
    pub max: Value,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum QueryOp {
    Create {
        key: String,
        value: EntityMap,
        index: Option<String>,
    },
    BatchCreate {
        entries: BTreeMap<String, EntityMap>,
        index: Option<String>,
    },
    Read {
        key: Option<String>,
        index: Option<String>,
    },
    BatchRead {
        keys: Vec<String>,
        index: Option<String>,
    },
    Update {
        key: String,
        value: EntityMap,
    },
    BatchUpdate {
        entries: BTreeMap<String, EntityMap>,
    },
    BatchUpsert {
        entries: BTreeMap<String, EntityMap>,
    },
    Remove {
        key: String,
    },
    BatchRemove {
        keys: Vec<String>,
    },
    List {
        key: Option<String>,
        index: Option<String>,
        first: Option<usize>,
        last: Option<usize>,
        before: Option<String>,
        after: Option<String>,
        query: Option<Vec<RangePredicateDto>>,
    },
    Purge,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RelationshipCreateDto {
    pub node_a: String,
    pub node_b: String,
    pub node_a_to_b_relationship_name: String,
    pub node_b_to_a_relationship_name: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RelationshipRemoveDto {
    pub node_a: String,
    pub node_b: String,
    pub a_to_b: String,
    pub b_to_a: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RelationshipListDto {
    pub name: String,
    pub node: String,
    pub first: Option<usize>,
    pub last: Option<usize>,
    pub before: Option<String>,
    pub after: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum RelationshipOp {
    Create(RelationshipCreateDto),
    BatchCreate { requests: Vec<RelationshipCreateDto> },
    Read { node_a: String, node_b: String, name: String },
    Remove(RelationshipRemoveDto),
    BatchRemove { requests: Vec<RelationshipRemoveDto> },
    RemoveNode { node: String },
    BatchRemoveNode { nodes: Vec<String> },
    List(RelationshipListDto),
    BatchList { requests: Vec<RelationshipListDto> },
    Purge,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum StoreOp {
    Backup,
    Restore { backup_id: String },
}
