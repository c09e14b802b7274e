mod artifact;
mod metric;
mod run;
mod run_config;
mod run_item;
mod run_status;
mod script;
mod stopwatch;
mod vendor_label;

pub use artifact::{Artifact, ArtifactId, ArtifactKind};
pub use metric::{Metric, MetricId, MetricName, MetricUnit};
pub use run::{Run, RunId, RunMode};
pub use run_config::{AudioFormat, ChainConfig, RunConfig, ServiceKind, VendorModels};
pub use run_item::{ItemSidecar, RunItem, RunItemId};
pub use run_status::{ItemStatus, RunStatus};
pub use script::{Script, ScriptItem};
pub use stopwatch::Stopwatch;
pub use vendor_label::VendorLabel;
