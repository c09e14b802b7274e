use std::sync::Arc;

use crate::application::ports::{ArtifactStore, BenchmarkRepository};
use crate::application::services::{AggregationService, RunService, VendorRegistry};

#[derive(Clone)]
pub struct AppState {
    pub run_service: Arc<RunService>,
    pub aggregation: Arc<AggregationService>,
    pub repository: Arc<dyn BenchmarkRepository>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub registry: Arc<VendorRegistry>,
}
