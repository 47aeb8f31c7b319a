//! Relationship Engine (spec §4.4).
//!
//! Symmetric named edges between node identifiers, maintained in both
//! directions with a persisted reverse-name mapping so cascade deletion
//! can recover the inverse directional name from just one side of an edge.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    chunked::ChunkedKv,
    error::{ErrorOrigin, InternalError, Result},
    key::{
        parse_relationship_set_key, relationship_name_key, relationship_set_key,
        RELATIONSHIP_NAME_PREFIX, RELATIONSHIP_PREFIX,
    },
    kv::TxnOp,
    pagination::{paginate, Page, PageArgs},
    value::Value,
};

///
/// CreateEdge
/// One edge descriptor: `(nodeA, nodeB)` related under the directional
/// name pair `(aToB, bToA)`.
///

#[derive(Clone, Debug)]
pub struct CreateEdge {
    pub node_a: String,
    pub node_b: String,
    pub a_to_b: String,
    pub b_to_a: String,
}

///
/// RemoveEdge
/// Mirrors [`CreateEdge`] for edge removal.
///

#[derive(Clone, Debug)]
pub struct RemoveEdge {
    pub node_a: String,
    pub node_b: String,
    pub a_to_b: String,
    pub b_to_a: String,
}

///
/// ListRequest
/// One relationship-listing request: neighbors of `node` under the
/// directional name `name`, paginated by `args`.
///

#[derive(Clone, Debug)]
pub struct ListRequest {
    pub node: String,
    pub name: String,
    pub args: PageArgs,
}

fn set_to_value(set: &BTreeSet<String>) -> Value {
    Value::Array(set.iter().cloned().map(Value::String).collect())
}

fn value_to_set(value: Option<&Value>) -> BTreeSet<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(String::from).collect(),
        _ => BTreeSet::new(),
    }
}

///
/// RelationshipEngine
/// Bidirectional edge maintenance with reverse-name mapping, cascade
/// deletion, and cursor-paginated listing.
///

pub struct RelationshipEngine {
    kv: Arc<ChunkedKv>,
}

impl RelationshipEngine {
    #[must_use]
    pub fn new(kv: Arc<ChunkedKv>) -> Self {
        Self { kv }
    }

    /// Create one edge: add `b` to `a`'s `aToB` set, `a` to `b`'s `bToA`
    /// set, and persist both name mappings, all in one transaction.
    #[tracing::instrument(skip(self), fields(a = %edge.node_a, b = %edge.node_b))]
    pub async fn create(&self, edge: &CreateEdge) -> Result<()> {
        let forward_key = relationship_set_key(&edge.node_a, &edge.a_to_b);
        let backward_key = relationship_set_key(&edge.node_b, &edge.b_to_a);

        let current = self
            .kv
            .get_many(&[forward_key.clone(), backward_key.clone()])
            .await?;

        let mut forward_set = value_to_set(current.get(&forward_key));
        forward_set.insert(edge.node_b.clone());

        let mut backward_set = value_to_set(current.get(&backward_key));
        backward_set.insert(edge.node_a.clone());

        let ops = vec![
            TxnOp::Put(forward_key, set_to_value(&forward_set)),
            TxnOp::Put(backward_key, set_to_value(&backward_set)),
            TxnOp::Put(
                relationship_name_key(&edge.a_to_b),
                Value::String(edge.b_to_a.clone()),
            ),
            TxnOp::Put(
                relationship_name_key(&edge.b_to_a),
                Value::String(edge.a_to_b.clone()),
            ),
        ];

        self.kv.transaction(ops).await
    }

    /// Create many edges. Two passes — `right = [(a's set, b), ...]` then
    /// `left = [(b's set, a), ...]` — applied sequentially so the two
    /// passes never race on the same set key within one call (spec §4.4).
    pub async fn batch_create(&self, edges: &[CreateEdge]) -> Result<()> {
        if edges.is_empty() {
            return Ok(());
        }

        self.apply_batch_side(edges.iter().map(|e| (e.node_a.as_str(), &e.a_to_b, e.node_b.as_str())))
            .await?;
        self.apply_batch_side(edges.iter().map(|e| (e.node_b.as_str(), &e.b_to_a, e.node_a.as_str())))
            .await?;

        let mut name_entries = Vec::new();
        for edge in edges {
            name_entries.push((relationship_name_key(&edge.a_to_b), Value::String(edge.b_to_a.clone())));
            name_entries.push((relationship_name_key(&edge.b_to_a), Value::String(edge.a_to_b.clone())));
        }
        self.kv.put_many(name_entries).await
    }

    /// Apply one side of a batch create: bulk-read the distinct set keys,
    /// merge additions in-memory (deduplicating existing members), bulk
    /// write.
    async fn apply_batch_side<'a>(
        &self,
        side: impl Iterator<Item = (&'a str, &'a String, &'a str)>,
    ) -> Result<()> {
        let side: Vec<(String, String)> = side
            .map(|(node, name, member)| (relationship_set_key(node, name), member.to_owned()))
            .collect();

        let distinct_keys: Vec<String> = side
            .iter()
            .map(|(set_key, _)| set_key.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let current = self.kv.get_many(&distinct_keys).await?;
        let mut merged: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for key in &distinct_keys {
            merged.insert(key.clone(), value_to_set(current.get(key)));
        }
        for (set_key, member) in &side {
            merged.entry(set_key.clone()).or_default().insert(member.clone());
        }

        let entries: Vec<(String, Value)> = merged
            .into_iter()
            .map(|(key, set)| (key, set_to_value(&set)))
            .collect();
        self.kv.put_many(entries).await
    }

    /// `{exists}` if a set exists for `(node_a, name)`, `NotFound`
    /// otherwise.
    pub async fn has_relationship(&self, node_a: &str, node_b: &str, name: &str) -> Result<bool> {
        let key = relationship_set_key(node_a, name);
        let fetched = self.kv.get_many(&[key.clone()]).await?;
        let Some(value) = fetched.get(&key) else {
            return Err(InternalError::not_found(
                ErrorOrigin::Relation,
                format!("no relationship set for node={node_a} name={name}"),
            ));
        };
        Ok(value_to_set(Some(value)).contains(node_b))
    }

    /// Remove one edge, transactionally mirroring `create`. A failure from
    /// the KV layer collapses to `Ok(false)` rather than propagating (spec
    /// §7: "a thrown exception from the KV layer collapses to
    /// `{success:false}`").
    pub async fn remove(&self, edge: &RemoveEdge) -> bool {
        let forward_key = relationship_set_key(&edge.node_a, &edge.a_to_b);
        let backward_key = relationship_set_key(&edge.node_b, &edge.b_to_a);

        let result: Result<()> = async {
            let current = self
                .kv
                .get_many(&[forward_key.clone(), backward_key.clone()])
                .await?;

            let mut forward_set = value_to_set(current.get(&forward_key));
            forward_set.remove(&edge.node_b);
            let mut backward_set = value_to_set(current.get(&backward_key));
            backward_set.remove(&edge.node_a);

            let ops = vec![
                TxnOp::Put(forward_key, set_to_value(&forward_set)),
                TxnOp::Put(backward_key, set_to_value(&backward_set)),
            ];
            self.kv.transaction(ops).await
        }
        .await;

        result.is_ok()
    }

    /// Cascade-delete every edge incident to `node`, in both directions.
    pub async fn remove_node(&self, node: &str) -> bool {
        self.remove_nodes(std::slice::from_ref(&node.to_owned()))
            .await
            .is_ok()
    }

    pub async fn batch_remove_node(&self, nodes: &[String]) -> bool {
        self.remove_nodes(nodes).await.is_ok()
    }

    async fn remove_nodes(&self, nodes: &[String]) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        tracing::debug!(nodes = nodes.len(), "cascading relationship cleanup for removed node(s)");

        let node_prefixes: Vec<String> = nodes
            .iter()
            .map(|node| format!("{RELATIONSHIP_PREFIX}{node}$"))
            .collect();

        // List all `relationship$<node>$*` set-keys for every node in one pass.
        let all_sets = self.kv.list_prefix(RELATIONSHIP_PREFIX).await?;
        let mut source_set_keys = Vec::new();
        for (key, _) in &all_sets {
            if node_prefixes.iter().any(|prefix| key.starts_with(prefix.as_str())) {
                source_set_keys.push(key.clone());
            }
        }

        if source_set_keys.is_empty() {
            return Ok(());
        }

        // For every source set key, recover its directional name and the
        // node being removed, then bulk-read the inverse names.
        let mut parsed = Vec::new();
        let mut name_keys = BTreeSet::new();
        for key in &source_set_keys {
            if let Some((owner_node, rel_name)) = parse_relationship_set_key(key) {
                name_keys.insert(relationship_name_key(rel_name));
                parsed.push((key.clone(), owner_node.to_owned(), rel_name.to_owned()));
            }
        }

        let name_keys: Vec<String> = name_keys.into_iter().collect();
        let inverse_names = self.kv.get_many(&name_keys).await?;

        // For every (sourceSetKey, target) pair, plan to remove the owning
        // node from the mirrored set under the inverse name.
        let mut mirror_updates: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (key, owner_node, rel_name) in &parsed {
            let members = value_to_set(all_sets.get(key));
            let inverse = inverse_names
                .get(&relationship_name_key(rel_name))
                .and_then(Value::as_str)
                .map(str::to_owned);
            let Some(inverse_name) = inverse else { continue };

            for target in members {
                if nodes.contains(&target) {
                    // Both sides are being removed; the mirror set is
                    // being deleted outright, nothing to patch.
                    continue;
                }
                let mirror_key = relationship_set_key(&target, &inverse_name);
                mirror_updates
                    .entry(mirror_key)
                    .or_default()
                    .insert(owner_node.clone());
            }
        }

        // Read current mirror sets, remove the departing members, write back.
        let mirror_keys: Vec<String> = mirror_updates.keys().cloned().collect();
        let current_mirrors = self.kv.get_many(&mirror_keys).await?;
        let mut mirror_entries = Vec::new();
        for (mirror_key, departing) in &mirror_updates {
            let mut members = value_to_set(current_mirrors.get(mirror_key));
            for node in departing {
                members.remove(node);
            }
            mirror_entries.push((mirror_key.clone(), set_to_value(&members)));
        }

        let delete_sources = self.kv.delete_many(source_set_keys);
        let write_mirrors = self.kv.put_many(mirror_entries);
        let (delete_result, write_result) = futures::join!(delete_sources, write_mirrors);
        delete_result?;
        write_result?;

        Ok(())
    }

    /// Delete every relationship row (sets and name mappings). Returns the
    /// number of rows deleted.
    pub async fn purge(&self) -> Result<usize> {
        let rows = self.kv.list_prefix(RELATIONSHIP_PREFIX).await?;
        let name_rows = self.kv.list_prefix(RELATIONSHIP_NAME_PREFIX).await?;
        let count = rows.len() + name_rows.len();
        let keys: Vec<String> = rows.keys().chain(name_rows.keys()).cloned().collect();
        self.kv.delete_many(keys).await?;
        Ok(count)
    }

    /// List a page of neighbors for one `(node, name)` pair.
    pub async fn list(&self, request: &ListRequest) -> Result<Page> {
        let key = relationship_set_key(&request.node, &request.name);
        let fetched = self.kv.get_many(&[key.clone()]).await?;
        let members = value_to_set(fetched.get(&key));
        let ordered: Vec<String> = members.into_iter().collect();
        paginate(&ordered, &request.args)
    }

    /// List pages for many requests with one up-front chunked read
    /// gathering every set key; a failure for one request degrades to an
    /// empty page rather than failing the whole batch (spec §4.4).
    pub async fn batch_list(&self, requests: &[ListRequest]) -> Result<Vec<Page>> {
        let keys: Vec<String> = requests
            .iter()
            .map(|r| relationship_set_key(&r.node, &r.name))
            .collect();
        let fetched = self.kv.get_many(&keys).await?;

        let mut pages = Vec::with_capacity(requests.len());
        for (request, key) in requests.iter().zip(keys.iter()) {
            let members = value_to_set(fetched.get(key));
            let ordered: Vec<String> = members.into_iter().collect();
            let page = paginate(&ordered, &request.args).unwrap_or(Page {
                items: Vec::new(),
                has_before: false,
                has_after: false,
            });
            pages.push(page);
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::memory_kv::MemoryKvBackend;

    fn engine() -> RelationshipEngine {
        RelationshipEngine::new(Arc::new(ChunkedKv::new(Arc::new(MemoryKvBackend::new()))))
    }

    #[tokio::test]
    async fn create_is_bidirectional_with_name_mapping() {
        let engine = engine();
        engine
            .create(&CreateEdge {
                node_a: "a".into(),
                node_b: "b".into(),
                a_to_b: "parent".into(),
                b_to_a: "child".into(),
            })
            .await
            .unwrap();

        assert!(engine.has_relationship("a", "b", "parent").await.unwrap());
        assert!(engine.has_relationship("b", "a", "child").await.unwrap());
    }

    #[tokio::test]
    async fn has_relationship_not_found_when_no_set_exists() {
        let engine = engine();
        assert!(engine.has_relationship("a", "b", "parent").await.is_err());
    }

    #[tokio::test]
    async fn remove_undoes_create() {
        let engine = engine();
        let edge = CreateEdge {
            node_a: "a".into(),
            node_b: "b".into(),
            a_to_b: "parent".into(),
            b_to_a: "child".into(),
        };
        engine.create(&edge).await.unwrap();

        let removed = engine
            .remove(&RemoveEdge {
                node_a: "a".into(),
                node_b: "b".into(),
                a_to_b: "parent".into(),
                b_to_a: "child".into(),
            })
            .await;
        assert!(removed);

        assert!(!engine.has_relationship("a", "b", "parent").await.unwrap());
    }

    #[tokio::test]
    async fn remove_node_cascades_both_directions() {
        let engine = engine();
        engine
            .create(&CreateEdge {
                node_a: "a".into(),
                node_b: "b".into(),
                a_to_b: "children".into(),
                b_to_a: "parents".into(),
            })
            .await
            .unwrap();

        assert!(engine.remove_node("a").await);

        assert!(engine
            .list(&ListRequest {
                node: "a".into(),
                name: "children".into(),
                args: PageArgs::default(),
            })
            .await
            .unwrap()
            .items
            .is_empty());
        assert!(engine
            .list(&ListRequest {
                node: "b".into(),
                name: "parents".into(),
                args: PageArgs::default(),
            })
            .await
            .unwrap()
            .items
            .is_empty());
    }

    #[tokio::test]
    async fn pagination_scenario_a_to_four_children() {
        let engine = engine();
        for child in ["b", "c", "d", "e"] {
            engine
                .create(&CreateEdge {
                    node_a: "a".into(),
                    node_b: child.into(),
                    a_to_b: "parent".into(),
                    b_to_a: "child".into(),
                })
                .await
                .unwrap();
        }

        let page = engine
            .list(&ListRequest {
                node: "a".into(),
                name: "parent".into(),
                args: PageArgs {
                    first: Some(2),
                    after: Some("b".into()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        assert_eq!(page.items, vec!["c".to_owned(), "d".to_owned()]);
        assert!(page.has_before);
        assert!(page.has_after);
    }

    #[tokio::test]
    async fn batch_list_degrades_individual_failures_to_empty_page() {
        let engine = engine();
        engine
            .create(&CreateEdge {
                node_a: "a".into(),
                node_b: "b".into(),
                a_to_b: "parent".into(),
                b_to_a: "child".into(),
            })
            .await
            .unwrap();

        let pages = engine
            .batch_list(&[
                ListRequest {
                    node: "a".into(),
                    name: "parent".into(),
                    args: PageArgs::default(),
                },
                ListRequest {
                    node: "a".into(),
                    name: "parent".into(),
                    args: PageArgs {
                        after: Some("unknown-cursor".into()),
                        ..Default::default()
                    },
                },
            ])
            .await
            .unwrap();

        assert_eq!(pages[0].items, vec!["b".to_owned()]);
        assert!(pages[1].items.is_empty());
    }

    #[tokio::test]
    async fn purge_removes_sets_and_name_mappings() {
        let engine = engine();
        engine
            .create(&CreateEdge {
                node_a: "a".into(),
                node_b: "b".into(),
                a_to_b: "parent".into(),
                b_to_a: "child".into(),
            })
            .await
            .unwrap();

        let deleted = engine.purge().await.unwrap();
        assert_eq!(deleted, 4); // 2 sets + 2 name mappings
        assert!(engine.has_relationship("a", "b", "parent").await.is_err());
    }
}
