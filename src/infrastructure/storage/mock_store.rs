use std::collections::HashMap;
use std::sync::Mutex;

use crate::application::ports::{ArtifactStore, ArtifactStoreError};
use crate::domain::ArtifactKind;

/// In-memory artifact store for tests and scaffold mode.
#[derive(Default)]
pub struct InMemoryArtifactStore {
    blobs: Mutex<HashMap<(ArtifactKind, String), Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(
        &self,
        kind: ArtifactKind,
        filename: &str,
        data: &[u8],
    ) -> Result<(), ArtifactStoreError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|e| ArtifactStoreError::WriteFailed(e.to_string()))?;
        blobs.insert((kind, filename.to_string()), data.to_vec());
        Ok(())
    }

    async fn fetch(
        &self,
        kind: ArtifactKind,
        filename: &str,
    ) -> Result<Vec<u8>, ArtifactStoreError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|e| ArtifactStoreError::ReadFailed(e.to_string()))?;
        blobs
            .get(&(kind, filename.to_string()))
            .cloned()
            .ok_or_else(|| ArtifactStoreError::NotFound(filename.to_string()))
    }

    async fn delete(&self, kind: ArtifactKind, filename: &str) -> Result<(), ArtifactStoreError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|e| ArtifactStoreError::DeleteFailed(e.to_string()))?;
        blobs
            .remove(&(kind, filename.to_string()))
            .map(|_| ())
            .ok_or_else(|| ArtifactStoreError::NotFound(filename.to_string()))
    }
}
