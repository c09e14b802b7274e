use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{ItemStatus, RunId, ServiceKind, VendorLabel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunItemId(Uuid);

impl RunItemId {
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

impl Default for RunItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Free-form JSON annotations attached to a run item: vendor/model labels
/// plus quality flags. The typed metric rows stay authoritative; this is
/// the small sidecar the UI and aggregations read labels from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemSidecar {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stt_vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stt_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Set when audio duration came from the size-based fallback estimate.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duration_estimated: bool,
    /// Set when a recorded RTF fell outside [0.01, 100].
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub rtf_anomaly: bool,
}

/// A single (input, vendor-assignment) attempt within a run.
#[derive(Debug, Clone)]
pub struct RunItem {
    pub id: RunItemId,
    pub run_id: RunId,
    pub script_item_id: Option<String>,
    pub vendor: VendorLabel,
    pub input_text: String,
    pub audio_file: Option<String>,
    pub transcript: Option<String>,
    pub status: ItemStatus,
    pub failure_reason: Option<String>,
    /// Pipe-separated `name:value` pairs, assembled from the metric rows
    /// on read. Convenience for the UI only.
    pub metrics_summary: Option<String>,
    pub sidecar: ItemSidecar,
    pub created_at: DateTime<Utc>,
}

impl RunItem {
    pub fn new(
        run_id: RunId,
        vendor: VendorLabel,
        input_text: String,
        script_item_id: Option<String>,
    ) -> Self {
        Self {
            id: RunItemId::new(),
            run_id,
            script_item_id,
            vendor,
            input_text,
            audio_file: None,
            transcript: None,
            status: ItemStatus::Pending,
            failure_reason: None,
            metrics_summary: None,
            sidecar: ItemSidecar::default(),
            created_at: Utc::now(),
        }
    }
}
