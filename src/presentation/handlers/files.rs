use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;

use crate::application::ports::ArtifactStoreError;
use crate::domain::ArtifactKind;
use crate::presentation::handlers::runs::ErrorResponse;
use crate::presentation::state::AppState;

fn audio_content_type(filename: &str) -> &'static str {
    let lower = filename.to_lowercase();
    if lower.ends_with(".wav") {
        "audio/wav"
    } else if lower.ends_with(".ogg") {
        "audio/ogg"
    } else if lower.ends_with(".flac") {
        "audio/flac"
    } else {
        "audio/mpeg"
    }
}

async fn serve(
    state: &AppState,
    kind: ArtifactKind,
    filename: &str,
    content_type: &'static str,
) -> axum::response::Response {
    match state.artifacts.fetch(kind, filename).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type)], bytes).into_response(),
        Err(ArtifactStoreError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("{} file not found: {}", kind, filename),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, filename, "Failed to read artifact");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to read artifact: {}", e),
                }),
            )
                .into_response()
        }
    }
}

#[tracing::instrument(skip(state))]
pub async fn serve_audio_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    serve(
        &state,
        ArtifactKind::Audio,
        &filename,
        audio_content_type(&filename),
    )
    .await
}

#[tracing::instrument(skip(state))]
pub async fn serve_transcript_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    serve(
        &state,
        ArtifactKind::Transcript,
        &filename,
        "text/plain; charset=utf-8",
    )
    .await
}
