//! In-memory [`KvBackend`] used by this crate's own tests and by downstream
//! crates that want a real backend without standing up external storage.
//! Not a production backend: everything lives in one `Mutex`-guarded map for
//! the process lifetime.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    error::Result,
    kv::{KvBackend, TxnOp},
    value::Value,
};

///
/// MemoryKvBackend
/// `KvBackend` over a single `Mutex<BTreeMap<String, Value>>`.
///

#[derive(Default)]
pub struct MemoryKvBackend {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryKvBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvBackend for MemoryKvBackend {
    async fn get_many(&self, keys: &[String]) -> Result<BTreeMap<String, Value>> {
        let entries = self.entries.lock().await;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    async fn put_many(&self, entries: Vec<(String, Value)>) -> Result<()> {
        let mut guard = self.entries.lock().await;
        for (key, value) in entries {
            guard.insert(key, value);
        }
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<()> {
        let mut guard = self.entries.lock().await;
        for key in keys {
            guard.remove(key);
        }
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<BTreeMap<String, Value>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn transaction(&self, ops: Vec<TxnOp>) -> Result<()> {
        let mut guard = self.entries.lock().await;
        for op in ops {
            match op {
                TxnOp::Put(key, value) => {
                    guard.insert(key, value);
                }
                TxnOp::Delete(key) => {
                    guard.remove(&key);
                }
            }
        }
        Ok(())
    }

    async fn purge_all(&self) -> Result<()> {
        self.entries.lock().await.clear();
        Ok(())
    }

    async fn snapshot(&self) -> Result<BTreeMap<String, Value>> {
        Ok(self.entries.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_prefix_only_returns_matching_keys() {
        let backend = MemoryKvBackend::new();
        backend
            .put_many(vec![
                ("idx:a".into(), Value::from("1")),
                ("idx:b".into(), Value::from("2")),
                ("entity-a".into(), Value::from("3")),
            ])
            .await
            .unwrap();

        let listed = backend.list_prefix("idx:").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains_key("idx:a"));
        assert!(listed.contains_key("idx:b"));
    }

    #[tokio::test]
    async fn transaction_applies_puts_and_deletes_together() {
        let backend = MemoryKvBackend::new();
        backend
            .put_many(vec![("a".into(), Value::from("1"))])
            .await
            .unwrap();

        backend
            .transaction(vec![
                TxnOp::Delete("a".into()),
                TxnOp::Put("b".into(), Value::from("2")),
            ])
            .await
            .unwrap();

        let fetched = backend.get_many(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(fetched.get("a"), None);
        assert_eq!(fetched.get("b"), Some(&Value::from("2")));
    }

    #[tokio::test]
    async fn purge_all_clears_every_entry() {
        let backend = MemoryKvBackend::new();
        backend
            .put_many(vec![("a".into(), Value::from("1"))])
            .await
            .unwrap();
        backend.purge_all().await.unwrap();
        assert!(backend.snapshot().await.unwrap().is_empty());
    }
}
