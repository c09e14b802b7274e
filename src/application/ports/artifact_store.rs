use async_trait::async_trait;

use crate::domain::ArtifactKind;

/// Opaque blob sink for generated audio and transcripts, keyed by the
/// artifact filename (`audio_{item_id}.{ext}`, `transcript_{item_id}.txt`).
/// Filenames embed the owning item id, so concurrent writers never collide.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(
        &self,
        kind: ArtifactKind,
        filename: &str,
        data: &[u8],
    ) -> Result<(), ArtifactStoreError>;

    async fn fetch(&self, kind: ArtifactKind, filename: &str)
        -> Result<Vec<u8>, ArtifactStoreError>;

    async fn delete(&self, kind: ArtifactKind, filename: &str) -> Result<(), ArtifactStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactStoreError {
    #[error("write failed: {0}")]
    WriteFailed(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("read failed: {0}")]
    ReadFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
