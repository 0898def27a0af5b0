use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::pipeline::{ErrorKind, PipelineResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub model: String,
}

/// Maps pipeline failure kinds to HTTP-style statuses for API callers.
pub fn status_for(result: &PipelineResult) -> StatusCode {
    match result.error_kind {
        None => StatusCode::OK,
        Some(ErrorKind::Validation) => StatusCode::BAD_REQUEST,
        Some(ErrorKind::Execution) => StatusCode::BAD_REQUEST,
        Some(ErrorKind::Cancelled) => StatusCode::REQUEST_TIMEOUT,
        Some(ErrorKind::Transport) => StatusCode::BAD_GATEWAY,
        Some(ErrorKind::Provider) => StatusCode::BAD_GATEWAY,
        Some(ErrorKind::Extraction) => StatusCode::BAD_GATEWAY,
        Some(ErrorKind::Configuration) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// Natural language search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SearchRequest>,
) -> Response {
    info!("api search: {}", payload.query);

    let token = state.request_token();
    let result = state.pipeline.translate_and_run(&payload.query, &token).await;

    (status_for(&result), Json(result)).into_response()
}

pub async fn get_schema(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.schema_text.clone()
}

pub async fn system_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = chrono::Utc::now() - state.startup_time;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds(),
        model: state.config.llm.model.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(kind: Option<ErrorKind>) -> PipelineResult {
        PipelineResult {
            query: "q".to_string(),
            succeeded: kind.is_none(),
            generated_text: None,
            rows: None,
            error: kind.map(|k| k.to_string()),
            error_kind: kind,
        }
    }

    #[test]
    fn success_maps_to_ok() {
        assert_eq!(status_for(&result_with(None)), StatusCode::OK);
    }

    #[test]
    fn failure_kinds_map_to_http_statuses() {
        let cases = [
            (ErrorKind::Validation, StatusCode::BAD_REQUEST),
            (ErrorKind::Execution, StatusCode::BAD_REQUEST),
            (ErrorKind::Cancelled, StatusCode::REQUEST_TIMEOUT),
            (ErrorKind::Transport, StatusCode::BAD_GATEWAY),
            (ErrorKind::Provider, StatusCode::BAD_GATEWAY),
            (ErrorKind::Extraction, StatusCode::BAD_GATEWAY),
            (ErrorKind::Configuration, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (kind, expected) in cases {
            assert_eq!(status_for(&result_with(Some(kind))), expected);
        }
    }
}
