use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::domain::{Script, ScriptItem};
use crate::presentation::handlers::runs::ErrorResponse;
use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct ScriptView {
    #[serde(flatten)]
    pub script: Script,
    pub items: Vec<ScriptItem>,
}

#[derive(Serialize)]
pub struct ScriptsResponse {
    pub scripts: Vec<ScriptView>,
}

#[tracing::instrument(skip(state))]
pub async fn list_scripts_handler(State(state): State<AppState>) -> impl IntoResponse {
    let scripts = match state.repository.list_scripts().await {
        Ok(scripts) => scripts,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list scripts");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to list scripts: {}", e),
                }),
            )
                .into_response();
        }
    };

    let mut views = Vec::with_capacity(scripts.len());
    for script in scripts {
        match state.repository.get_script_items(&script.id).await {
            Ok(items) => views.push(ScriptView { script, items }),
            Err(e) => {
                tracing::error!(error = %e, script_id = %script.id, "Failed to load script items");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: format!("Failed to load script items: {}", e),
                    }),
                )
                    .into_response();
            }
        }
    }

    (StatusCode::OK, Json(ScriptsResponse { scripts: views })).into_response()
}
