mod dashboard;
mod files;
mod health;
mod runs;
mod scripts;

pub use dashboard::{
    dashboard_insights_handler, dashboard_stats_handler, latency_percentiles_handler,
};
pub use files::{serve_audio_handler, serve_transcript_handler};
pub use health::health_handler;
pub use runs::{create_run_handler, get_run_handler, list_runs_handler, quick_run_handler};
pub use scripts::list_scripts_handler;
