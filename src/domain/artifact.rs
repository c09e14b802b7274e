use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::RunItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Audio,
    Transcript,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Audio => "audio",
            ArtifactKind::Transcript => "transcript",
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(ArtifactKind::Audio),
            "transcript" => Ok(ArtifactKind::Transcript),
            _ => Err(format!("Invalid artifact kind: {}", s)),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A generated blob tied to a run item: written once before the item is
/// marked completed, read-only afterwards, purged with its item.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub id: ArtifactId,
    pub item_id: RunItemId,
    pub kind: ArtifactKind,
    pub content_type: String,
    pub filename: String,
    pub byte_len: u64,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(
        item_id: RunItemId,
        kind: ArtifactKind,
        content_type: impl Into<String>,
        filename: impl Into<String>,
        byte_len: u64,
    ) -> Self {
        Self {
            id: ArtifactId::new(),
            item_id,
            kind,
            content_type: content_type.into(),
            filename: filename.into(),
            byte_len,
            created_at: Utc::now(),
        }
    }
}
