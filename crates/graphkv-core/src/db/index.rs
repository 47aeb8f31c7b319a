//! Index Engine (spec §4.3).
//!
//! Owns the set of declared indexes as an in-memory snapshot, refreshed
//! from the `idx:` prefix under a write-locked critical region so readers
//! never observe a partially loaded set (spec §5, "await this refresh
//! before anyone else reads me").

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    chunked::ChunkedKv,
    error::{ErrorOrigin, InternalError, Result},
    key::{index_decl_id, index_entry_key, property_from_index_decl_id, INDEX_DECL_PREFIX},
    value::{EntityMap, Value},
};

///
/// IndexDecl
/// One declared index: `{id, property}`, `id = "idx:" + property`.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IndexDecl {
    pub id: String,
    pub property: String,
}

impl IndexDecl {
    #[must_use]
    pub fn new(property: impl Into<String>) -> Self {
        let property = property.into();
        Self {
            id: index_decl_id(&property),
            property,
        }
    }

    fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("id".to_owned(), Value::String(self.id.clone()));
        map.insert("property".to_owned(), Value::String(self.property.clone()));
        Value::Object(map)
    }

    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let id = object.get("id")?.as_str()?.to_owned();
        let property = object.get("property")?.as_str()?.to_owned();
        Some(Self { id, property })
    }
}

///
/// IndexEngine
/// Maintains declared indexes and derives the index-row fan-out for entity
/// writes.
///

pub struct IndexEngine {
    kv: Arc<ChunkedKv>,
    declarations: RwLock<BTreeMap<String, IndexDecl>>,
}

impl IndexEngine {
    #[must_use]
    pub fn new(kv: Arc<ChunkedKv>) -> Self {
        Self {
            kv,
            declarations: RwLock::new(BTreeMap::new()),
        }
    }

    /// Refresh the snapshot from the `idx:` prefix. Holds the write lock
    /// for the whole listing so no reader observes a partial set.
    pub async fn refresh(&self) -> Result<()> {
        let rows = self.kv.list_prefix(INDEX_DECL_PREFIX).await?;
        let mut next = BTreeMap::new();
        for (id, value) in rows {
            if let Some(decl) = IndexDecl::from_value(&value) {
                next.insert(id, decl);
            }
        }
        let count = next.len();
        // Hold the write lock for the whole swap so no reader ever observes
        // a partially loaded declaration set.
        *self.declarations.write().await = next;
        tracing::debug!(count, "index declaration snapshot refreshed");
        Ok(())
    }

    pub async fn create_index(&self, property: &str) -> Result<IndexDecl> {
        let decl = IndexDecl::new(property);
        self.kv
            .put_many(vec![(decl.id.clone(), decl.to_value())])
            .await?;
        self.refresh().await?;
        Ok(decl)
    }

    pub async fn update_index(&self, id: &str, property: &str) -> Result<IndexDecl> {
        let decl = IndexDecl {
            id: id.to_owned(),
            property: property.to_owned(),
        };
        self.kv
            .put_many(vec![(decl.id.clone(), decl.to_value())])
            .await?;
        self.refresh().await?;
        Ok(decl)
    }

    pub async fn read_index(&self, id: &str) -> Result<IndexDecl> {
        self.declarations
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| InternalError::not_found(ErrorOrigin::Index, format!("no such index: {id}")))
    }

    /// Delete the declaration at `id`. Returns whether anything was deleted.
    pub async fn remove_index(&self, id: &str) -> Result<bool> {
        let existed = self.declarations.read().await.contains_key(id);
        self.kv.delete_many(vec![id.to_owned()]).await?;
        self.refresh().await?;
        Ok(existed)
    }

    pub async fn list_indexes(&self) -> BTreeMap<String, IndexDecl> {
        self.declarations.read().await.clone()
    }

    /// The primary `(key, value)` entry plus one index entry per declared
    /// index whose property is present on `value` (spec §4.3 `expandWrite`).
    pub async fn expand_write(
        &self,
        key: &str,
        value: &EntityMap,
    ) -> Vec<(String, Value)> {
        let mut entries = vec![(key.to_owned(), Value::Object(value.clone().into_inner()))];
        entries.extend(self.indexed_entries(value).await);
        entries
    }

    /// The set of index-entry storage keys a given entity value would
    /// occupy (spec §4.3 `indexedKeysFor`).
    pub async fn indexed_keys_for(&self, value: &EntityMap) -> Vec<String> {
        self.indexed_entries(value)
            .await
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    }

    async fn indexed_entries(&self, value: &EntityMap) -> Vec<(String, Value)> {
        let declarations = self.declarations.read().await;
        let mut entries = Vec::new();
        for decl in declarations.values() {
            let Some(property_value) = value.get(&decl.property) else {
                continue;
            };
            let Some(component) = property_value.index_component() else {
                continue;
            };
            entries.push((
                index_entry_key(&decl.property, &component),
                Value::Object(value.clone().into_inner()),
            ));
        }
        entries
    }

    /// Index keys to delete for a removed entity. Per spec §9's resolved
    /// open question, this reads the entity's *actual* stored properties
    /// (not a guess based on the entity key) and derives the index keys it
    /// actually occupies.
    pub async fn append_delete_keys(&self, entity_key: &str, value: &EntityMap, out: &mut Vec<String>) {
        out.push(entity_key.to_owned());
        out.extend(self.indexed_keys_for(value).await);
    }

    /// Index rows present for `old` but not for `new` — must be deleted on
    /// update (spec §4.3 `dangling`).
    pub async fn dangling(&self, old: &EntityMap, new: &EntityMap) -> Vec<String> {
        let old_keys = self.indexed_keys_for(old).await;
        let new_keys: std::collections::BTreeSet<String> =
            self.indexed_keys_for(new).await.into_iter().collect();
        old_keys
            .into_iter()
            .filter(|key| !new_keys.contains(key))
            .collect()
    }

    #[must_use]
    pub fn property_of(id: &str) -> Option<&str> {
        property_from_index_decl_id(id)
    }
}
