use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryError;
use crate::domain::{
    Artifact, ItemSidecar, Metric, MetricName, Run, RunId, RunItem, RunItemId, RunStatus, Script,
    ScriptItem,
};

/// Everything the repository must persist for one successful item, in a
/// single transaction: metric rows, artifact rows, the item row updates
/// and the status flip to completed commit together or not at all.
#[derive(Debug)]
pub struct ItemCompletion {
    pub item_id: RunItemId,
    pub metrics: Vec<Metric>,
    pub artifacts: Vec<Artifact>,
    pub audio_file: Option<String>,
    pub transcript: Option<String>,
    pub sidecar: ItemSidecar,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunTotals {
    pub total_runs: i64,
    pub completed_runs: i64,
    pub total_items: i64,
}

/// Durable mapping of runs → items → metrics → artifact pointers.
/// Reads are snapshot-consistent within a single call.
#[async_trait]
pub trait BenchmarkRepository: Send + Sync {
    async fn create_run(&self, run: &Run) -> Result<(), RepositoryError>;

    async fn append_items(&self, items: &[RunItem]) -> Result<(), RepositoryError>;

    async fn mark_run_started(&self, id: RunId) -> Result<(), RepositoryError>;

    async fn finish_run(&self, id: RunId, status: RunStatus) -> Result<(), RepositoryError>;

    async fn set_item_running(&self, id: RunItemId) -> Result<(), RepositoryError>;

    async fn fail_item(&self, id: RunItemId, reason: &str) -> Result<(), RepositoryError>;

    async fn complete_item(&self, completion: &ItemCompletion) -> Result<(), RepositoryError>;

    async fn get_run(&self, id: RunId) -> Result<Option<Run>, RepositoryError>;

    async fn list_runs(&self, limit: i64, offset: i64) -> Result<Vec<Run>, RepositoryError>;

    async fn get_item(&self, id: RunItemId) -> Result<Option<RunItem>, RepositoryError>;

    async fn list_items_by_run(&self, run_id: RunId) -> Result<Vec<RunItem>, RepositoryError>;

    async fn list_scripts(&self) -> Result<Vec<Script>, RepositoryError>;

    async fn get_script_items(&self, script_id: &str)
        -> Result<Vec<ScriptItem>, RepositoryError>;

    /// Values of one metric across items created in (from, to], ascending.
    async fn metric_values_between(
        &self,
        name: MetricName,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<f64>, RepositoryError>;

    async fn run_totals_since(&self, since: DateTime<Utc>) -> Result<RunTotals, RepositoryError>;

    /// Items created in the window, with metric summaries populated.
    async fn items_since(&self, since: DateTime<Utc>) -> Result<Vec<RunItem>, RepositoryError>;
}
