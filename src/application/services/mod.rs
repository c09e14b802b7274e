mod aggregation_service;
mod registry;
mod run_executor;
mod run_service;
pub mod scoring;

pub use aggregation_service::{
    AggregationService, DashboardStats, Insights, LatencyPercentiles, ServiceMix, VendorPairing,
    VendorUsage, percentile,
};
pub use registry::VendorRegistry;
pub use run_executor::{terminal_status, ExecutionPolicy, ItemError, RunExecutor};
pub use run_service::{
    BatchFormat, CreatedRun, NewRun, RunService, RunServiceError, ValidationError,
};
