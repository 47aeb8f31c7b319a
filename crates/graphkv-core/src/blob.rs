//! The `BlobStore` trait: the external collaborator backup/restore talks to
//! (spec §4.6, "Blob Store (external)"). Backup serializes the full KV
//! image to one named JSON blob; restore reads it back. The core engine
//! never assumes a concrete object store — only this trait.

use async_trait::async_trait;

use crate::error::Result;

/// Content-addressed-by-name blob storage. Implementations are expected to
/// be cheap to clone/share, same convention as [`crate::kv::KvBackend`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `name`, replacing any existing blob of that name.
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<()>;

    /// Read the blob named `name`, or `None` if it doesn't exist.
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>>;
}
