//! Response bodies for the operation catalog (spec §6). One-directional:
//! these are only ever produced by [`crate::router::Router`], never parsed,
//! so there is no ambiguity in the untagged `Serialize` impl below.

use std::collections::BTreeMap;

use graphkv_core::{db::index::IndexDecl, value::EntityMap};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct EntityListResponse {
    pub entries: BTreeMap<String, EntityMap>,
    pub has_before: bool,
    pub has_after: bool,
}

#[derive(Debug, Serialize)]
pub struct RelationshipListResponse {
    pub relationships: Vec<String>,
    pub has_before: bool,
    pub has_after: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    IndexDecl(IndexDecl),
    IndexList(BTreeMap<String, IndexDecl>),
    Success { success: bool },
    Entity(EntityMap),
    OptionalEntities(Vec<Option<EntityMap>>),
    Entities(Vec<EntityMap>),
    EntityList(EntityListResponse),
    Bool(bool),
    Exists { exists: bool },
    RelationshipList(RelationshipListResponse),
    RelationshipLists(Vec<RelationshipListResponse>),
    Count(usize),
    BlobName(String),
    RestoreOutcome { count: usize },
    Diagnostic(String),
}
