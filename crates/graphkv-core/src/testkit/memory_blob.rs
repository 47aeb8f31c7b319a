//! In-memory [`BlobStore`] used by this crate's own tests and by the
//! facade's integration tests (via the `testkit` feature).

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{blob::BlobStore, error::Result};

///
/// MemoryBlobStore
/// `BlobStore` over a single `Mutex<BTreeMap<String, Vec<u8>>>`.
///

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        self.blobs.lock().await.insert(name.to_owned(), bytes);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().await.get(name).cloned())
    }
}
