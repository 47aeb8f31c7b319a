//! Entity Engine (spec §4.5).
//!
//! CRUD, batch, list, and range-query operations on entities. Orchestrates
//! [`IndexEngine`] on every mutation and [`RelationshipEngine`] on
//! deletion. Holds references to both (not ownership) — they are
//! constructed leaves-first and are independent of each other.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use tokio::sync::RwLock;

use crate::{
    chunked::ChunkedKv,
    db::{index::IndexEngine, relation::RelationshipEngine},
    error::{ErrorOrigin, InternalError, Result},
    key::{index_entry_key, index_prefix, is_reserved_key},
    kv::TxnOp,
    pagination::{paginate, PageArgs},
    value::{EntityMap, Value},
};

///
/// RangePredicate
/// One `{property, min, max}` clause of a range-query `listQuery` request.
/// All predicates on a request must hold for an entry to survive.
///

#[derive(Clone, Debug)]
pub struct RangePredicate {
    pub property: String,
    pub min: Value,
    pub max: Value,
}

///
/// ListRequest
/// `listQuery`'s request body: prefix resolution via `key`/`index`, plus
/// either cursor-pagination args or range predicates (spec §4.5 — these
/// two modes are mutually exclusive in practice, but nothing stops a
/// caller from supplying both; paginated mode takes precedence).
///

#[derive(Clone, Debug, Default)]
pub struct ListRequest {
    pub key: Option<String>,
    pub index: Option<String>,
    pub page: PageArgs,
    pub predicates: Vec<RangePredicate>,
}

///
/// EntityPage
/// `listQuery`'s response: entities ordered by `id`, plus cursor
/// continuation flags (set only in paginated mode; `false`/`false` for
/// range queries and full listings, which have no cursor concept).
///

#[derive(Clone, Debug, Default)]
pub struct EntityPage {
    pub entries: BTreeMap<String, EntityMap>,
    pub has_before: bool,
    pub has_after: bool,
}

///
/// EntityEngine
/// Owns no storage of its own beyond a full-listing cache; all durable
/// state lives behind `kv`.
///

pub struct EntityEngine {
    kv: Arc<ChunkedKv>,
    index: Arc<IndexEngine>,
    relationships: Arc<RelationshipEngine>,
    full_list_cache: RwLock<BTreeMap<String, Vec<(String, EntityMap)>>>,
}

impl EntityEngine {
    #[must_use]
    pub fn new(kv: Arc<ChunkedKv>, index: Arc<IndexEngine>, relationships: Arc<RelationshipEngine>) -> Self {
        Self {
            kv,
            index,
            relationships,
            full_list_cache: RwLock::new(BTreeMap::new()),
        }
    }

    /// `value' = {...value, id: value.id ?? key}`; persist `value'` and its
    /// index fan-out in one transaction. Returns `value'`.
    pub async fn create(&self, key: &str, value: EntityMap) -> Result<EntityMap> {
        let resolved = value.with_resolved_id(key);
        self.full_list_cache.write().await.clear();

        let ops: Vec<TxnOp> = self
            .index
            .expand_write(key, &resolved)
            .await
            .into_iter()
            .map(|(k, v)| TxnOp::Put(k, v))
            .collect();
        self.kv.transaction(ops).await?;
        Ok(resolved)
    }

    /// Writes via Chunked KV (bulk, not per-entity transactional). Returns
    /// only the caller-visible primary entries, in input order.
    pub async fn batch_create(&self, entries: Vec<(String, EntityMap)>) -> Result<Vec<(String, EntityMap)>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        self.full_list_cache.write().await.clear();

        let mut resolved_entries = Vec::with_capacity(entries.len());
        let mut kv_entries = Vec::new();
        for (key, value) in entries {
            let resolved = value.with_resolved_id(&key);
            kv_entries.extend(self.index.expand_write(&key, &resolved).await);
            resolved_entries.push((key, resolved));
        }
        self.kv.put_many(kv_entries).await?;
        Ok(resolved_entries)
    }

    /// Resolves the storage key as `key` alone, `index` alone, or
    /// `index + "--" + key` for indexed reads (spec §4.5). `NotFound` if
    /// absent.
    pub async fn read(&self, key: Option<&str>, index: Option<&str>) -> Result<EntityMap> {
        let storage_key = resolve_single_key(key, index)?;
        let fetched = self.kv.get_many(&[storage_key.clone()]).await?;
        let value = fetched
            .get(&storage_key)
            .ok_or_else(|| InternalError::not_found(ErrorOrigin::Entity, format!("no entity at {storage_key}")))?;
        to_entity_map(value)
    }

    /// Same key resolution per element, one index shared across the whole
    /// batch (matching the `{keys, index?}` request shape). Preserves
    /// input order; misses are `None`, not an error.
    pub async fn batch_read(&self, keys: &[String], index: Option<&str>) -> Result<Vec<Option<EntityMap>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let storage_keys: Vec<String> = keys
            .iter()
            .map(|key| resolve_single_key(Some(key), index))
            .collect::<Result<_>>()?;

        let fetched = self.kv.get_many(&storage_keys).await?;

        storage_keys
            .iter()
            .map(|storage_key| fetched.get(storage_key).map(to_entity_map).transpose())
            .collect()
    }

    /// Strict: `NotFound` unless `key` currently exists. Merge
    /// `{...current, ...patch}`; re-expand to index rows; delete dangling
    /// index rows; all in one transaction.
    pub async fn update(&self, key: &str, patch: &EntityMap) -> Result<EntityMap> {
        let current = self.read(Some(key), None).await?;
        let merged = current.merged(patch);

        self.full_list_cache.write().await.clear();

        let dangling = self.index.dangling(&current, &merged).await;
        let new_entries = self.index.expand_write(key, &merged).await;
        let written: BTreeSet<&String> = new_entries.iter().map(|(k, _)| k).collect();

        let mut ops: Vec<TxnOp> = new_entries.into_iter().map(|(k, v)| TxnOp::Put(k, v)).collect();
        for dangling_key in dangling {
            if !written.contains(&dangling_key) {
                ops.push(TxnOp::Delete(dangling_key));
            }
        }
        self.kv.transaction(ops).await?;
        Ok(merged)
    }

    /// Shared engine over `(entries, throwOnMissing)`: strict update when
    /// `throw_on_missing` is set, upsert otherwise. Bulk-read current
    /// values, merge, accumulate dangling keys across all entries into one
    /// set, one batched write and one batched delete (spec §4.5 — batch
    /// writes are bulk-efficient, not transactional across entries).
    async fn batch_write(&self, entries: Vec<(String, EntityMap)>, throw_on_missing: bool) -> Result<Vec<EntityMap>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = entries.iter().map(|(key, _)| key.clone()).collect();
        let current = self.kv.get_many(&keys).await?;

        if throw_on_missing {
            if let Some(missing) = keys.iter().find(|key| !current.contains_key(key.as_str())) {
                return Err(InternalError::not_found(
                    ErrorOrigin::Entity,
                    format!("no entity at {missing}"),
                ));
            }
        }

        self.full_list_cache.write().await.clear();

        let mut merged_values = Vec::with_capacity(entries.len());
        let mut put_entries = Vec::new();
        let mut dangling_keys: BTreeSet<String> = BTreeSet::new();

        for (key, patch) in &entries {
            let current_entity = current
                .get(key)
                .and_then(Value::as_object)
                .cloned()
                .map(EntityMap::from)
                .unwrap_or_default();

            let merged = if current.contains_key(key) {
                current_entity.merged(patch)
            } else {
                patch.clone().with_resolved_id(key)
            };

            dangling_keys.extend(self.index.dangling(&current_entity, &merged).await);
            put_entries.extend(self.index.expand_write(key, &merged).await);
            merged_values.push(merged);
        }

        let written: BTreeSet<&String> = put_entries.iter().map(|(k, _)| k).collect();
        let delete_keys: Vec<String> = dangling_keys
            .into_iter()
            .filter(|key| !written.contains(key))
            .collect();

        self.kv.put_many(put_entries).await?;
        self.kv.delete_many(delete_keys).await?;

        Ok(merged_values)
    }

    pub async fn batch_update(&self, entries: Vec<(String, EntityMap)>) -> Result<Vec<EntityMap>> {
        self.batch_write(entries, true).await
    }

    pub async fn batch_upsert(&self, entries: Vec<(String, EntityMap)>) -> Result<Vec<EntityMap>> {
        self.batch_write(entries, false).await
    }

    /// Compose the primary key with every index key derived from the
    /// entity's current stored properties; delete as one KV call.
    /// `DeleteFailed` if the entity didn't exist (zero rows to delete).
    /// Cascades a `removeNode` to the Relationship Engine on success.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let fetched = self.kv.get_many(&[key.to_owned()]).await?;
        let Some(value) = fetched.get(key) else {
            return Err(InternalError::delete_failed(
                ErrorOrigin::Entity,
                format!("no rows to delete for key {key}"),
            ));
        };
        let entity = to_entity_map(value)?;

        self.full_list_cache.write().await.clear();

        let mut delete_keys = Vec::new();
        self.index.append_delete_keys(key, &entity, &mut delete_keys).await;
        self.kv.delete_many(delete_keys).await?;

        self.relationships.remove_node(key).await;
        Ok(())
    }

    /// Union of per-entity delete key-sets, one Chunked KV delete, then
    /// cascade `batchRemoveNode` for all input keys.
    pub async fn batch_remove(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let fetched = self.kv.get_many(keys).await?;

        self.full_list_cache.write().await.clear();

        let mut delete_keys = BTreeSet::new();
        for key in keys {
            if let Some(value) = fetched.get(key) {
                if let Ok(entity) = to_entity_map(value) {
                    let mut per_entity = Vec::new();
                    self.index.append_delete_keys(key, &entity, &mut per_entity).await;
                    delete_keys.extend(per_entity);
                }
            }
        }

        self.kv.delete_many(delete_keys.into_iter().collect()).await?;
        self.relationships.batch_remove_node(keys).await;
        Ok(())
    }

    /// Dispatches to cursor pagination (if any of `{first,last,before,
    /// after}` is present) or range-query mode (if `predicates` is
    /// non-empty), matching spec §4.5. Results are projected to an ordered
    /// mapping keyed by each entry's `id`.
    pub async fn list(&self, request: &ListRequest) -> Result<EntityPage> {
        let prefix = resolve_list_prefix(request.key.as_deref(), request.index.as_deref());

        if request.page.is_paginated() {
            let ordered_keys = self.ordered_keys_for_prefix(&prefix).await?;
            let page = paginate(&ordered_keys, &request.page)?;
            let fetched = self.kv.get_many(&page.items).await?;

            let mut entries = BTreeMap::new();
            for storage_key in &page.items {
                if let Some(value) = fetched.get(storage_key) {
                    if let Ok(entity) = to_entity_map(value) {
                        entries.insert(entity.resolved_id(storage_key), entity);
                    }
                }
            }

            return Ok(EntityPage {
                entries,
                has_before: page.has_before,
                has_after: page.has_after,
            });
        }

        let full = self.full_list(&prefix).await?;
        let mut entries = BTreeMap::new();
        for (storage_key, entity) in full {
            if request.predicates.iter().all(|pred| predicate_holds(pred, &entity)) {
                entries.insert(entity.resolved_id(&storage_key), entity);
            }
        }

        Ok(EntityPage {
            entries,
            has_before: false,
            has_after: false,
        })
    }

    /// Deletes the entire KV namespace. Does not touch backups.
    pub async fn purge_all(&self) -> Result<()> {
        self.full_list_cache.write().await.clear();
        self.kv.purge_all().await
    }

    async fn ordered_keys_for_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .kv
            .list_prefix(prefix)
            .await?
            .into_keys()
            .filter(|key| !is_reserved_key(key))
            .collect())
    }

    /// The full, unfiltered, uncursored listing for one prefix. Cached —
    /// only this exact shape of listing is cache-eligible (spec §4.5).
    /// Index declarations and relationship rows are excluded here, not just
    /// filtered by `to_entity_map` failing to parse them — an index
    /// declaration (`idx:<property>` -> `{id, property}`) is a valid JSON
    /// object and would otherwise decode as a bogus entity whenever a
    /// `listQuery` has neither `key` nor `index` and scans the bare prefix.
    async fn full_list(&self, prefix: &str) -> Result<Vec<(String, EntityMap)>> {
        if let Some(cached) = self.full_list_cache.read().await.get(prefix) {
            return Ok(cached.clone());
        }

        let rows = self.kv.list_prefix(prefix).await?;
        let mut listing = Vec::with_capacity(rows.len());
        for (storage_key, value) in rows {
            if is_reserved_key(&storage_key) {
                continue;
            }
            if let Ok(entity) = to_entity_map(&value) {
                listing.push((storage_key, entity));
            }
        }

        self.full_list_cache
            .write()
            .await
            .insert(prefix.to_owned(), listing.clone());
        Ok(listing)
    }
}

fn resolve_single_key(key: Option<&str>, index: Option<&str>) -> Result<String> {
    match (key, index) {
        (Some(key), Some(index)) => Ok(index_entry_key(index, key)),
        (Some(key), None) => Ok(key.to_owned()),
        (None, Some(index)) => Ok(index.to_owned()),
        (None, None) => Err(InternalError::bad_request(
            ErrorOrigin::Entity,
            "read requires `key` and/or `index`",
        )),
    }
}

/// Resolves `listQuery`'s prefix from `key`/`index`. Unlike
/// `resolve_single_key`, `(None, None)` is a legal shape here (spec §8:
/// `listQuery({})` is exercised directly) and resolves to the blank
/// prefix — a scan of the entire flat namespace. `full_list` and
/// `ordered_keys_for_prefix` are responsible for excluding the
/// non-entity rows such a scan would otherwise pick up.
fn resolve_list_prefix(key: Option<&str>, index: Option<&str>) -> String {
    match (key, index) {
        (Some(key), _) => key.to_owned(),
        (None, Some(index)) => index_prefix(index),
        (None, None) => String::new(),
    }
}

fn to_entity_map(value: &Value) -> Result<EntityMap> {
    value
        .as_object()
        .cloned()
        .map(EntityMap::from)
        .ok_or_else(|| InternalError::bad_request(ErrorOrigin::Entity, "stored value is not an object"))
}

fn predicate_holds(predicate: &RangePredicate, entity: &EntityMap) -> bool {
    let Some(value) = entity.get(&predicate.property) else {
        return false;
    };
    let above_min = value
        .compare(&predicate.min)
        .is_some_and(|ordering| ordering != Ordering::Less);
    let below_max = value
        .compare(&predicate.max)
        .is_some_and(|ordering| ordering != Ordering::Greater);
    above_min && below_max
}
