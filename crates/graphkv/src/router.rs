//! `Router`: matches `(type, operation)` to the correct engine method —
//! nested sum types, not reflection (spec §6, Design Notes).

use std::time::{SystemTime, UNIX_EPOCH};

use graphkv_core::{
    db::{
        entity::{ListRequest as EntityListRequest, RangePredicate},
        relation::{CreateEdge, ListRequest as RelationshipListRequest, RemoveEdge},
    },
    pagination::PageArgs,
};

use crate::{
    error::Result,
    request::{IndexOp, QueryOp, RelationshipOp, Request, StoreOp},
    response::{EntityListResponse, RelationshipListResponse, Response},
    store::Store,
};

///
/// Router
/// Stateless dispatcher: every call takes the `Store` it should act on.
///

pub struct Router;

impl Router {
    pub async fn dispatch(store: &Store, request: Request) -> Result<Response> {
        match request {
            Request::Index(op) => Self::dispatch_index(store, op).await,
            Request::Query(op) => Self::dispatch_query(store, op).await,
            Request::Relationship(op) => Self::dispatch_relationship(store, op).await,
            Request::Store(op) => Self::dispatch_store(store, op).await,
            Request::Diagnostic { echo } => Ok(Response::Diagnostic(echo)),
        }
    }

    async fn dispatch_index(store: &Store, op: IndexOp) -> Result<Response> {
        match op {
            IndexOp::Create { property } => {
                let decl = store.index().create_index(&property).await?;
                Ok(Response::IndexDecl(decl))
            }
            IndexOp::Read { id } => {
                let decl = store.index().read_index(&id).await?;
                Ok(Response::IndexDecl(decl))
            }
            IndexOp::Update { id, property } => {
                let decl = store.index().update_index(&id, &property).await?;
                Ok(Response::IndexDecl(decl))
            }
            IndexOp::Remove { id } => {
                let success = store.index().remove_index(&id).await?;
                Ok(Response::Success { success })
            }
            IndexOp::List => Ok(Response::IndexList(store.index().list_indexes().await)),
        }
    }

    async fn dispatch_query(store: &Store, op: QueryOp) -> Result<Response> {
        match op {
            QueryOp::Create { key, value, index: _ } => {
                let entity = store.entities().create(&key, value).await?;
                Ok(Response::Entity(entity))
            }
            QueryOp::BatchCreate { entries, index: _ } => {
                let created = store.entities().batch_create(entries.into_iter().collect()).await?;
                Ok(Response::Entities(created.into_iter().map(|(_, value)| value).collect()))
            }
            QueryOp::Read { key, index } => {
                let entity = store.entities().read(key.as_deref(), index.as_deref()).await?;
                Ok(Response::Entity(entity))
            }
            QueryOp::BatchRead { keys, index } => {
                let results = store.entities().batch_read(&keys, index.as_deref()).await?;
                Ok(Response::OptionalEntities(results))
            }
            QueryOp::Update { key, value } => {
                let entity = store.entities().update(&key, &value).await?;
                Ok(Response::Entity(entity))
            }
            QueryOp::BatchUpdate { entries } => {
                let updated = store.entities().batch_update(entries.into_iter().collect()).await?;
                Ok(Response::Entities(updated))
            }
            QueryOp::BatchUpsert { entries } => {
                let updated = store.entities().batch_upsert(entries.into_iter().collect()).await?;
                Ok(Response::Entities(updated))
            }
            QueryOp::Remove { key } => {
                store.entities().remove(&key).await?;
                Ok(Response::Success { success: true })
            }
            QueryOp::BatchRemove { keys } => {
                store.entities().batch_remove(&keys).await?;
                Ok(Response::Success { success: true })
            }
            QueryOp::List {
                key,
                index,
                first,
                last,
                before,
                after,
                query,
            } => {
                let predicates = query
                    .unwrap_or_default()
                    .into_iter()
                    .map(|predicate| RangePredicate {
                        property: predicate.property,
                        min: predicate.min,
                        max: predicate.max,
                    })
                    .collect();

                let page = store
                    .entities()
                    .list(&EntityListRequest {
                        key,
                        index,
                        page: PageArgs { first, last, before, after },
                        predicates,
                    })
                    .await?;

                Ok(Response::EntityList(EntityListResponse {
                    entries: page.entries,
                    has_before: page.has_before,
                    has_after: page.has_after,
                }))
            }
            QueryOp::Purge => {
                store.entities().purge_all().await?;
                Ok(Response::Bool(true))
            }
        }
    }

    async fn dispatch_relationship(store: &Store, op: RelationshipOp) -> Result<Response> {
        match op {
            RelationshipOp::Create(dto) => {
                store
                    .relationships()
                    .create(&CreateEdge {
                        node_a: dto.node_a,
                        node_b: dto.node_b,
                        a_to_b: dto.node_a_to_b_relationship_name,
                        b_to_a: dto.node_b_to_a_relationship_name,
                    })
                    .await?;
                Ok(Response::Success { success: true })
            }
            RelationshipOp::BatchCreate { requests } => {
                let edges: Vec<CreateEdge> = requests
                    .into_iter()
                    .map(|dto| CreateEdge {
                        node_a: dto.node_a,
                        node_b: dto.node_b,
                        a_to_b: dto.node_a_to_b_relationship_name,
                        b_to_a: dto.node_b_to_a_relationship_name,
                    })
                    .collect();
                store.relationships().batch_create(&edges).await?;
                Ok(Response::Success { success: true })
            }
            RelationshipOp::Read { node_a, node_b, name } => {
                let exists = store.relationships().has_relationship(&node_a, &node_b, &name).await?;
                Ok(Response::Exists { exists })
            }
            RelationshipOp::Remove(dto) => {
                let success = store
                    .relationships()
                    .remove(&RemoveEdge {
                        node_a: dto.node_a,
                        node_b: dto.node_b,
                        a_to_b: dto.a_to_b,
                        b_to_a: dto.b_to_a,
                    })
                    .await;
                Ok(Response::Success { success })
            }
            RelationshipOp::BatchRemove { requests } => {
                let mut success = true;
                for dto in requests {
                    success &= store
                        .relationships()
                        .remove(&RemoveEdge {
                            node_a: dto.node_a,
                            node_b: dto.node_b,
                            a_to_b: dto.a_to_b,
                            b_to_a: dto.b_to_a,
                        })
                        .await;
                }
                Ok(Response::Success { success })
            }
            RelationshipOp::RemoveNode { node } => {
                let success = store.relationships().remove_node(&node).await;
                Ok(Response::Success { success })
            }
            RelationshipOp::BatchRemoveNode { nodes } => {
                let success = store.relationships().batch_remove_node(&nodes).await;
                Ok(Response::Success { success })
            }
            RelationshipOp::List(dto) => {
                let page = store
                    .relationships()
                    .list(&RelationshipListRequest {
                        node: dto.node,
                        name: dto.name,
                        args: PageArgs {
                            first: dto.first,
                            last: dto.last,
                            before: dto.before,
                            after: dto.after,
                        },
                    })
                    .await?;
                Ok(Response::RelationshipList(RelationshipListResponse {
                    relationships: page.items,
                    has_before: page.has_before,
                    has_after: page.has_after,
                }))
            }
            RelationshipOp::BatchList { requests } => {
                let reqs: Vec<RelationshipListRequest> = requests
                    .into_iter()
                    .map(|dto| RelationshipListRequest {
                        node: dto.node,
                        name: dto.name,
                        args: PageArgs {
                            first: dto.first,
                            last: dto.last,
                            before: dto.before,
                            after: dto.after,
                        },
                    })
                    .collect();
                let pages = store.relationships().batch_list(&reqs).await?;
                Ok(Response::RelationshipLists(
                    pages
                        .into_iter()
                        .map(|page| RelationshipListResponse {
                            relationships: page.items,
                            has_before: page.has_before,
                            has_after: page.has_after,
                        })
                        .collect(),
                ))
            }
            RelationshipOp::Purge => {
                let count = store.relationships().purge().await?;
                Ok(Response::Count(count))
            }
        }
    }

    async fn dispatch_store(store: &Store, op: StoreOp) -> Result<Response> {
        match op {
            StoreOp::Backup => {
                let name = store.backup().backup(now_millis(), None).await?;
                Ok(Response::BlobName(name))
            }
            StoreOp::Restore { backup_id } => {
                let outcome = store.backup().restore(&backup_id, now_millis()).await?;
                Ok(Response::RestoreOutcome { count: outcome.count })
            }
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as u64
}
