use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{RunConfig, RunStatus, VendorLabel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
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

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the run exercises vendors: one capability at a time, or a full
/// TTS→STT pipeline per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    Isolated,
    Chained,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Isolated => "isolated",
            RunMode::Chained => "chained",
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "isolated" => Ok(RunMode::Isolated),
            "chained" => Ok(RunMode::Chained),
            _ => Err(format!("Invalid run mode: {}", s)),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-initiated benchmark execution. Owns its run items exclusively.
#[derive(Debug, Clone)]
pub struct Run {
    pub id: RunId,
    pub mode: RunMode,
    pub vendors: Vec<VendorLabel>,
    pub config: RunConfig,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Run {
    pub fn new(mode: RunMode, vendors: Vec<VendorLabel>, config: RunConfig) -> Self {
        Self {
            id: RunId::new(),
            mode,
            vendors,
            config,
            status: RunStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}
