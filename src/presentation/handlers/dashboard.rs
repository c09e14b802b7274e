use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::domain::MetricName;
use crate::presentation::handlers::runs::ErrorResponse;
use crate::presentation::state::AppState;

#[tracing::instrument(skip(state))]
pub async fn dashboard_stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.aggregation.dashboard_stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to compute dashboard stats");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to compute stats: {}", e),
                }),
            )
                .into_response()
        }
    }
}

#[tracing::instrument(skip(state))]
pub async fn dashboard_insights_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.aggregation.insights().await {
        Ok(insights) => (StatusCode::OK, Json(insights)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to compute insights");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to compute insights: {}", e),
                }),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PercentilesQuery {
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_metric() -> String {
    "e2e_latency".to_string()
}

fn default_days() -> i64 {
    7
}

#[tracing::instrument(skip(state))]
pub async fn latency_percentiles_handler(
    State(state): State<AppState>,
    Query(query): Query<PercentilesQuery>,
) -> impl IntoResponse {
    let metric = match query.metric.parse::<MetricName>() {
        Ok(
            name @ (MetricName::E2eLatency | MetricName::TtsLatency | MetricName::SttLatency),
        ) => name,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Invalid metric. Use e2e_latency|tts_latency|stt_latency".to_string(),
                }),
            )
                .into_response();
        }
    };
    let days = query.days.clamp(1, 365);

    match state.aggregation.latency_percentiles(metric, days).await {
        Ok(percentiles) => (StatusCode::OK, Json(percentiles)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to compute percentiles");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to compute percentiles: {}", e),
                }),
            )
                .into_response()
        }
    }
}
