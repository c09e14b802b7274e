use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::services::{BatchFormat, NewRun, RunServiceError};
use crate::domain::{ItemSidecar, Run, RunConfig, RunId, RunItem, RunMode};
use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn bad_request(message: impl Into<String>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn internal_error(message: impl Into<String>) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

#[derive(Deserialize)]
pub struct CreateRunRequest {
    pub mode: String,
    #[serde(default)]
    pub vendors: Vec<String>,
    #[serde(default)]
    pub config: RunConfig,
    #[serde(default)]
    pub text_inputs: Vec<String>,
    #[serde(default)]
    pub script_ids: Vec<String>,
    #[serde(default)]
    pub batch_input: Option<String>,
    #[serde(default)]
    pub batch_format: Option<String>,
}

#[derive(Serialize)]
pub struct CreateRunResponse {
    pub run_id: String,
    pub accepted_items_count: usize,
}

fn to_new_run(request: CreateRunRequest) -> Result<NewRun, String> {
    let mode = request.mode.parse::<RunMode>()?;
    let batch_format = request
        .batch_format
        .as_deref()
        .map(str::parse::<BatchFormat>)
        .transpose()?;
    Ok(NewRun {
        mode: Some(mode),
        vendors: request.vendors,
        config: request.config,
        text_inputs: request.text_inputs,
        script_ids: request.script_ids,
        batch_input: request.batch_input,
        batch_format,
    })
}

async fn submit(state: &AppState, new_run: NewRun) -> axum::response::Response {
    match state.run_service.create_run(new_run).await {
        Ok(created) => (
            StatusCode::ACCEPTED,
            Json(CreateRunResponse {
                run_id: created.run_id.to_string(),
                accepted_items_count: created.accepted_items,
            }),
        )
            .into_response(),
        Err(RunServiceError::Validation(e)) => bad_request(e.to_string()),
        Err(RunServiceError::Repository(e)) => {
            tracing::error!(error = %e, "Run creation failed");
            internal_error(format!("Failed to create run: {}", e))
        }
    }
}

#[tracing::instrument(skip(state, request))]
pub async fn create_run_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateRunRequest>,
) -> impl IntoResponse {
    match to_new_run(request) {
        Ok(new_run) => submit(&state, new_run).await,
        Err(message) => bad_request(message),
    }
}

#[derive(Deserialize)]
pub struct QuickRunRequest {
    pub text: String,
    pub vendors: Vec<String>,
    pub mode: String,
    #[serde(default)]
    pub config: RunConfig,
}

/// Single-utterance convenience wrapper around run creation.
#[tracing::instrument(skip(state, request))]
pub async fn quick_run_handler(
    State(state): State<AppState>,
    Json(request): Json<QuickRunRequest>,
) -> impl IntoResponse {
    let mode = match request.mode.parse::<RunMode>() {
        Ok(mode) => mode,
        Err(message) => return bad_request(message),
    };
    let new_run = NewRun {
        mode: Some(mode),
        vendors: request.vendors,
        config: request.config,
        text_inputs: vec![request.text],
        ..NewRun::default()
    };
    submit(&state, new_run).await
}

#[derive(Serialize)]
pub struct ItemView {
    pub id: String,
    pub script_item_id: Option<String>,
    pub vendor: String,
    pub status: String,
    pub input_text: String,
    pub transcript: Option<String>,
    pub audio_path: Option<String>,
    pub metrics_summary: Option<String>,
    pub failure_reason: Option<String>,
    pub sidecar: ItemSidecar,
    pub created_at: String,
}

fn item_view(item: RunItem) -> ItemView {
    ItemView {
        id: item.id.to_string(),
        script_item_id: item.script_item_id,
        vendor: item.vendor.to_string(),
        status: item.status.as_str().to_string(),
        input_text: item.input_text,
        transcript: item.transcript,
        audio_path: item.audio_file,
        metrics_summary: item.metrics_summary,
        failure_reason: item.failure_reason,
        sidecar: item.sidecar,
        created_at: item.created_at.to_rfc3339(),
    }
}

#[derive(Serialize)]
pub struct RunView {
    pub id: String,
    pub mode: String,
    pub vendors: Vec<String>,
    pub status: String,
    pub config: RunConfig,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub items: Vec<ItemView>,
}

fn run_view(run: Run, items: Vec<RunItem>) -> RunView {
    RunView {
        id: run.id.to_string(),
        mode: run.mode.as_str().to_string(),
        vendors: run.vendors.iter().map(|v| v.to_string()).collect(),
        status: run.status.as_str().to_string(),
        config: run.config,
        created_at: run.created_at.to_rfc3339(),
        started_at: run.started_at.map(|ts| ts.to_rfc3339()),
        finished_at: run.finished_at.map(|ts| ts.to_rfc3339()),
        items: items.into_iter().map(item_view).collect(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct RunsResponse {
    pub runs: Vec<RunView>,
}

#[tracing::instrument(skip(state))]
pub async fn list_runs_handler(
    State(state): State<AppState>,
    Query(query): Query<ListRunsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.clamp(1, 200);
    let offset = query.offset.max(0);

    let runs = match state.repository.list_runs(limit, offset).await {
        Ok(runs) => runs,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list runs");
            return internal_error(format!("Failed to list runs: {}", e));
        }
    };

    let mut views = Vec::with_capacity(runs.len());
    for run in runs {
        match state.repository.list_items_by_run(run.id).await {
            Ok(items) => views.push(run_view(run, items)),
            Err(e) => {
                tracing::error!(error = %e, run_id = %run.id, "Failed to load run items");
                return internal_error(format!("Failed to load run items: {}", e));
            }
        }
    }

    (StatusCode::OK, Json(RunsResponse { runs: views })).into_response()
}

#[derive(Serialize)]
pub struct RunResponse {
    pub run: RunView,
}

#[tracing::instrument(skip(state))]
pub async fn get_run_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    let uuid = match Uuid::parse_str(&run_id) {
        Ok(uuid) => uuid,
        Err(_) => return bad_request(format!("Invalid run ID: {}", run_id)),
    };
    let id = RunId::from_uuid(uuid);

    match state.repository.get_run(id).await {
        Ok(Some(run)) => match state.repository.list_items_by_run(id).await {
            Ok(items) => (
                StatusCode::OK,
                Json(RunResponse {
                    run: run_view(run, items),
                }),
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load run items");
                internal_error(format!("Failed to load run items: {}", e))
            }
        },
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Run not found: {}", run_id),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch run");
            internal_error(format!("Failed to fetch run: {}", e))
        }
    }
}
