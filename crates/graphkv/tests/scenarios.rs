//! The six literal end-to-end scenarios (spec §8) driven through the full
//! stack: `Router::dispatch` over a `Store` backed by the in-memory
//! `KvBackend`/`BlobStore` reference implementations. Mirrors the
//! teacher's `icydb-core/tests/db/...` convention of colocating
//! cross-cutting scenario tests in one `tests/` directory, separate from
//! the `#[cfg(test)]` unit tests living alongside each engine module.

use std::{collections::BTreeMap, sync::Arc};

use graphkv::prelude::*;
use graphkv_core::testkit::{memory_blob::MemoryBlobStore, memory_kv::MemoryKvBackend};

fn store() -> Store {
    Store::new(
        Arc::new(MemoryKvBackend::new()),
        Arc::new(MemoryBlobStore::new()),
        "partition-a",
    )
}

fn entity(pairs: &[(&str, f64)]) -> EntityMap {
    let mut map = EntityMap::new();
    for (key, value) in pairs {
        map.insert(*key, Value::from(*value));
    }
    map
}

#[tokio::test]
async fn scenario_1_index_round_trip() {
    let store = store();
    store.init().await.unwrap();

    Router::dispatch(
        &store,
        Request::Index(IndexOp::Create { property: "a".into() }),
    )
    .await
    .unwrap();

    Router::dispatch(
        &store,
        Request::Query(QueryOp::Create {
            key: "entity-a".into(),
            value: entity(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]),
            index: None,
        }),
    )
    .await
    .unwrap();

    let response = Router::dispatch(
        &store,
        Request::Query(QueryOp::Read {
            key: Some("1".into()),
            index: Some("a".into()),
        }),
    )
    .await
    .unwrap();

    let Response::Entity(found) = response else {
        panic!("expected Entity response")
    };
    assert_eq!(found.get("id"), Some(&Value::from("entity-a")));
    assert_eq!(found.get("a"), Some(&Value::from(1.0)));
    assert_eq!(found.get("b"), Some(&Value::from(2.0)));
    assert_eq!(found.get("c"), Some(&Value::from(3.0)));
}

#[tokio::test]
async fn scenario_2_relationship_pagination() {
    let store = store();
    store.init().await.unwrap();

    for child in ["b", "c", "d", "e"] {
        Router::dispatch(
            &store,
            Request::Relationship(RelationshipOp::Create(RelationshipCreateDto {
                node_a: "a".into(),
                node_b: child.into(),
                node_a_to_b_relationship_name: "parent".into(),
                node_b_to_a_relationship_name: "child".into(),
            })),
        )
        .await
        .unwrap();
    }

    let response = Router::dispatch(
        &store,
        Request::Relationship(RelationshipOp::List(RelationshipListDto {
            node: "a".into(),
            name: "parent".into(),
            first: Some(2),
            last: None,
            before: None,
            after: Some("b".into()),
        })),
    )
    .await
    .unwrap();

    let Response::RelationshipList(page) = response else {
        panic!("expected RelationshipList response")
    };
    assert_eq!(page.relationships, vec!["c".to_owned(), "d".to_owned()]);
    assert!(page.has_before);
    assert!(page.has_after);
}

#[tokio::test]
async fn scenario_3_range_query() {
    let store = store();
    store.init().await.unwrap();

    let mut entries = BTreeMap::new();
    entries.insert("entity-a".to_owned(), entity(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]));
    entries.insert("entity-b".to_owned(), entity(&[("a", 4.0), ("b", 5.0), ("c", 6.0)]));
    entries.insert("entity-c".to_owned(), entity(&[("a", 7.0), ("b", 8.0), ("c", 9.0)]));

    Router::dispatch(
        &store,
        Request::Query(QueryOp::BatchCreate { entries, index: None }),
    )
    .await
    .unwrap();

    let response = Router::dispatch(
        &store,
        Request::Query(QueryOp::List {
            key: Some("entity".into()),
            index: None,
            first: None,
            last: None,
            before: None,
            after: None,
            query: Some(vec![RangePredicateDto {
                property: "b".into(),
                min: Value::from(5.0),
                max: Value::from(8.0),
            }]),
        }),
    )
    .await
    .unwrap();

    let Response::EntityList(page) = response else {
        panic!("expected EntityList response")
    };
    let mut keys: Vec<&String> = page.entries.keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["entity-b", "entity-c"]);
}

#[tokio::test]
async fn scenario_4_cascade_on_delete() {
    let store = store();
    store.init().await.unwrap();

    Router::dispatch(
        &store,
        Request::Query(QueryOp::Create {
            key: "a".into(),
            value: entity(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]),
            index: None,
        }),
    )
    .await
    .unwrap();

    Router::dispatch(
        &store,
        Request::Relationship(RelationshipOp::Create(RelationshipCreateDto {
            node_a: "a".into(),
            node_b: "b".into(),
            node_a_to_b_relationship_name: "children".into(),
            node_b_to_a_relationship_name: "parents".into(),
        })),
    )
    .await
    .unwrap();

    Router::dispatch(&store, Request::Query(QueryOp::Remove { key: "a".into() }))
        .await
        .unwrap();

    for (node, name) in [("a", "children"), ("b", "parents")] {
        let response = Router::dispatch(
            &store,
            Request::Relationship(RelationshipOp::List(RelationshipListDto {
                node: node.into(),
                name: name.into(),
                first: None,
                last: None,
                before: None,
                after: None,
            })),
        )
        .await
        .unwrap();
        let Response::RelationshipList(page) = response else {
            panic!("expected RelationshipList response")
        };
        assert!(page.relationships.is_empty());
    }
}

#[tokio::test]
async fn scenario_5_backup_and_restore() {
    let store = store();
    store.init().await.unwrap();

    let mut entries = BTreeMap::new();
    entries.insert("entity-a".to_owned(), entity(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]));
    entries.insert("entity-b".to_owned(), entity(&[("a", 4.0), ("b", 5.0), ("c", 6.0)]));

    Router::dispatch(
        &store,
        Request::Query(QueryOp::BatchCreate { entries, index: None }),
    )
    .await
    .unwrap();

    let backup_response = Router::dispatch(&store, Request::Store(StoreOp::Backup))
        .await
        .unwrap();
    let Response::BlobName(backup_id) = backup_response else {
        panic!("expected BlobName response")
    };

    Router::dispatch(&store, Request::Query(QueryOp::Purge))
        .await
        .unwrap();

    Router::dispatch(&store, Request::Store(StoreOp::Restore { backup_id }))
        .await
        .unwrap();

    let response = Router::dispatch(
        &store,
        Request::Query(QueryOp::List {
            key: Some("entity".into()),
            index: None,
            first: None,
            last: None,
            before: None,
            after: None,
            query: None,
        }),
    )
    .await
    .unwrap();

    let Response::EntityList(page) = response else {
        panic!("expected EntityList response")
    };
    let mut keys: Vec<&String> = page.entries.keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["entity-a", "entity-b"]);
}

#[tokio::test]
async fn scenario_6_batch_upsert_updates_index() {
    let store = store();
    store.init().await.unwrap();

    Router::dispatch(
        &store,
        Request::Index(IndexOp::Create { property: "a".into() }),
    )
    .await
    .unwrap();

    Router::dispatch(
        &store,
        Request::Query(QueryOp::Create {
            key: "entity-a".into(),
            value: entity(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]),
            index: None,
        }),
    )
    .await
    .unwrap();

    let mut entries = BTreeMap::new();
    entries.insert("entity-a".to_owned(), entity(&[("a", 101.0), ("b", 2.0), ("c", 3.0)]));
    entries.insert("entity-b".to_owned(), entity(&[("a", 104.0), ("b", 5.0), ("c", 6.0)]));

    Router::dispatch(&store, Request::Query(QueryOp::BatchUpsert { entries }))
        .await
        .unwrap();

    let response = Router::dispatch(
        &store,
        Request::Query(QueryOp::List {
            key: None,
            index: Some("a".into()),
            first: None,
            last: None,
            before: None,
            after: None,
            query: None,
        }),
    )
    .await
    .unwrap();

    let Response::EntityList(page) = response else {
        panic!("expected EntityList response")
    };
    assert_eq!(page.entries.len(), 2);
    let a_values: Vec<f64> = page
        .entries
        .values()
        .filter_map(|entity| entity.get("a").and_then(Value::as_f64))
        .collect();
    assert!(a_values.contains(&101.0));
    assert!(a_values.contains(&104.0));
}
