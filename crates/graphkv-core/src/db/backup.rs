//! Backup / Restore (spec §4.6).
//!
//! Backup serializes the full KV image to one JSON blob named
//! `<partition_id>/graph-store-<epoch_millis>[-<reason>].json`. Restore
//! fetches a blob by name, takes a safety backup tagged `before-restore`,
//! purges the partition, and re-inserts the parsed mapping.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    blob::BlobStore,
    chunked::ChunkedKv,
    error::{ErrorOrigin, InternalError, Result},
    value::Value,
};

///
/// RestoreOutcome
/// The number of keys re-inserted during a restore.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RestoreOutcome {
    pub count: usize,
}

///
/// BackupEngine
/// Backs up and restores a partition's full KV image via a [`BlobStore`].
///

pub struct BackupEngine {
    kv: Arc<ChunkedKv>,
    blobs: Arc<dyn BlobStore>,
    partition_id: String,
}

impl BackupEngine {
    #[must_use]
    pub fn new(kv: Arc<ChunkedKv>, blobs: Arc<dyn BlobStore>, partition_id: impl Into<String>) -> Self {
        Self {
            kv,
            blobs,
            partition_id: partition_id.into(),
        }
    }

    /// Serialize the full KV image and write it under
    /// `<partition_id>/graph-store-<epoch_millis>[-<reason>].json`. `reason`
    /// is an arbitrary caller-supplied tag (e.g. `"before-restore"`).
    /// Returns the blob name.
    pub async fn backup(&self, epoch_millis: u64, reason: Option<&str>) -> Result<String> {
        let snapshot = self.kv.snapshot().await?;
        let name = self.blob_name(epoch_millis, reason);
        let bytes = serialize_image(&snapshot)?;
        self.blobs.put(&name, bytes).await?;
        Ok(name)
    }

    /// Fetch the blob named `name`, take a safety backup tagged
    /// `before-restore`, purge the partition, and re-insert the parsed
    /// mapping. `NotFound` if the blob doesn't exist.
    pub async fn restore(&self, name: &str, safety_backup_epoch_millis: u64) -> Result<RestoreOutcome> {
        tracing::info!(blob = name, "restoring partition from backup");
        let bytes = self.blobs.get(name).await?.ok_or_else(|| {
            InternalError::not_found(ErrorOrigin::Backup, format!("no such backup blob: {name}"))
        })?;
        let image = deserialize_image(&bytes)?;

        let safety_name = self
            .backup(safety_backup_epoch_millis, Some("before-restore"))
            .await?;
        tracing::info!(blob = safety_name, "safety backup taken before purge");

        self.kv.purge_all().await?;

        let count = image.len();
        let entries: Vec<(String, Value)> = image.into_iter().collect();
        self.kv.put_many(entries).await?;

        tracing::info!(count, "restore complete");
        Ok(RestoreOutcome { count })
    }

    fn blob_name(&self, epoch_millis: u64, reason: Option<&str>) -> String {
        match reason {
            Some(reason) => format!(
                "{}/graph-store-{epoch_millis}-{reason}.json",
                self.partition_id
            ),
            None => format!("{}/graph-store-{epoch_millis}.json", self.partition_id),
        }
    }
}

fn serialize_image(image: &BTreeMap<String, Value>) -> Result<Vec<u8>> {
    serde_json::to_vec(image)
        .map_err(|error| InternalError::bad_request(ErrorOrigin::Backup, error.to_string()))
}

fn deserialize_image(bytes: &[u8]) -> Result<BTreeMap<String, Value>> {
    serde_json::from_slice(bytes)
        .map_err(|error| InternalError::bad_request(ErrorOrigin::Backup, error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{memory_blob::MemoryBlobStore, memory_kv::MemoryKvBackend};

    fn engine() -> BackupEngine {
        BackupEngine::new(
            Arc::new(ChunkedKv::new(Arc::new(MemoryKvBackend::new()))),
            Arc::new(MemoryBlobStore::new()),
            "partition-a",
        )
    }

    #[tokio::test]
    async fn backup_name_includes_partition_and_epoch() {
        let engine = engine();
        let name = engine.backup(1_700_000_000_000, None).await.unwrap();
        assert_eq!(name, "partition-a/graph-store-1700000000000.json");
    }

    #[tokio::test]
    async fn backup_name_includes_reason_when_given() {
        let engine = engine();
        let name = engine
            .backup(1_700_000_000_000, Some("before-restore"))
            .await
            .unwrap();
        assert_eq!(
            name,
            "partition-a/graph-store-1700000000000-before-restore.json"
        );
    }

    #[tokio::test]
    async fn restore_round_trips_through_backup() {
        let engine = engine();
        engine
            .kv
            .put_many(vec![("a".into(), Value::from("1")), ("b".into(), Value::from("2"))])
            .await
            .unwrap();

        let name = engine.backup(1_700_000_000_000, None).await.unwrap();

        engine.kv.put_many(vec![("c".into(), Value::from("3"))]).await.unwrap();

        let outcome = engine.restore(&name, 1_700_000_000_001).await.unwrap();
        assert_eq!(outcome.count, 2);

        let fetched = engine.kv.get_many(&["a".into(), "b".into(), "c".into()]).await.unwrap();
        assert_eq!(fetched.get("a"), Some(&Value::from("1")));
        assert_eq!(fetched.get("b"), Some(&Value::from("2")));
        assert_eq!(fetched.get("c"), None);
    }

    #[tokio::test]
    async fn restore_takes_a_before_restore_safety_backup() {
        let engine = engine();
        engine.kv.put_many(vec![("a".into(), Value::from("1"))]).await.unwrap();
        let name = engine.backup(1_700_000_000_000, None).await.unwrap();

        engine.kv.put_many(vec![("a".into(), Value::from("2"))]).await.unwrap();
        engine.restore(&name, 1_700_000_000_001).await.unwrap();

        let safety_blob = engine
            .blobs
            .get("partition-a/graph-store-1700000000001-before-restore.json")
            .await
            .unwrap();
        assert!(safety_blob.is_some());
    }

    #[tokio::test]
    async fn restore_missing_blob_is_not_found() {
        let engine = engine();
        let error = engine.restore("partition-a/missing.json", 1).await.unwrap_err();
        assert!(error.is_not_found());
    }
}
