use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::presentation::handlers::{
    create_run_handler, dashboard_insights_handler, dashboard_stats_handler, get_run_handler,
    health_handler, latency_percentiles_handler, list_runs_handler, list_scripts_handler,
    quick_run_handler, serve_audio_handler, serve_transcript_handler,
};
use crate::presentation::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/runs", post(create_run_handler).get(list_runs_handler))
        .route("/api/runs/quick", post(quick_run_handler))
        .route("/api/runs/{run_id}", get(get_run_handler))
        .route("/api/scripts", get(list_scripts_handler))
        .route("/api/audio/{filename}", get(serve_audio_handler))
        .route("/api/transcript/{filename}", get(serve_transcript_handler))
        .route("/api/dashboard/stats", get(dashboard_stats_handler))
        .route("/api/dashboard/insights", get(dashboard_insights_handler))
        .route(
            "/api/dashboard/latency_percentiles",
            get(latency_percentiles_handler),
        )
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
