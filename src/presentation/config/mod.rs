mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    AggregationSettings, DatabaseSettings, ExecutionSettings, LoggingSettings, ServerSettings,
    Settings, StorageSettings, VendorSettings,
};
