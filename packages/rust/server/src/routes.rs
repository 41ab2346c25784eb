//! Request handlers.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use ideascope_core::{ComposedResult, EvaluationRequest, SilentObserver};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: ComposedResult,
}

/// `POST /chat`: run one evaluation.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<EvaluationRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let reply = state.pipeline.evaluate(&request, &SilentObserver).await?;
    Ok(Json(ChatResponse { reply }))
}

/// `GET /health`
pub async fn health_handler() -> &'static str {
    "OK"
}
