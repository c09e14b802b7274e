use std::path::PathBuf;
use std::sync::Arc;

use object_store::local::LocalFileSystem;
use object_store::path::Path as StorePath;
use object_store::{ObjectStore, PutPayload};

use crate::application::ports::{ArtifactStore, ArtifactStoreError};
use crate::domain::ArtifactKind;

/// Artifact store over two local directories, one per artifact kind
/// (`storage/audio`, `storage/transcripts` by default).
pub struct LocalArtifactStore {
    audio: Arc<LocalFileSystem>,
    transcripts: Arc<LocalFileSystem>,
}

impl LocalArtifactStore {
    pub fn new(audio_dir: PathBuf, transcript_dir: PathBuf) -> Result<Self, ArtifactStoreError> {
        Ok(Self {
            audio: Arc::new(open_dir(audio_dir)?),
            transcripts: Arc::new(open_dir(transcript_dir)?),
        })
    }

    fn store_for(&self, kind: ArtifactKind) -> &LocalFileSystem {
        match kind {
            ArtifactKind::Audio => &self.audio,
            ArtifactKind::Transcript => &self.transcripts,
        }
    }
}

fn open_dir(dir: PathBuf) -> Result<LocalFileSystem, ArtifactStoreError> {
    std::fs::create_dir_all(&dir).map_err(ArtifactStoreError::Io)?;
    LocalFileSystem::new_with_prefix(dir)
        .map_err(|e| ArtifactStoreError::WriteFailed(e.to_string()))
}

#[async_trait::async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put(
        &self,
        kind: ArtifactKind,
        filename: &str,
        data: &[u8],
    ) -> Result<(), ArtifactStoreError> {
        let path = StorePath::from(filename);
        self.store_for(kind)
            .put(&path, PutPayload::from(data.to_vec()))
            .await
            .map_err(|e| ArtifactStoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn fetch(
        &self,
        kind: ArtifactKind,
        filename: &str,
    ) -> Result<Vec<u8>, ArtifactStoreError> {
        let path = StorePath::from(filename);
        let result = self
            .store_for(kind)
            .get(&path)
            .await
            .map_err(|e| ArtifactStoreError::NotFound(e.to_string()))?;
        let bytes = result
            .bytes()
            .await
            .map_err(|e| ArtifactStoreError::ReadFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, kind: ArtifactKind, filename: &str) -> Result<(), ArtifactStoreError> {
        let path = StorePath::from(filename);
        self.store_for(kind)
            .delete(&path)
            .await
            .map_err(|e| ArtifactStoreError::DeleteFailed(e.to_string()))
    }
}
