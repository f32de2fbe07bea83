use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{
    error::ApiResult,
    extractors::ValidatedJson,
    models::tutor::{TutorRequest, TutorResponse},
    services::AppState,
};

/// POST /api/v1/tutor
///
/// Stateless exchange: the client sends its own history and context.
/// Generation failures still answer 200 with an apology.
pub async fn tutor_exchange(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<TutorRequest>,
) -> ApiResult<impl IntoResponse> {
    tracing::debug!(
        "Tutor exchange: history={}, document_mode={}, module={:?}",
        req.chat_history.len(),
        req.is_document_mode,
        req.active_module.as_ref().map(|m| m.title.as_str())
    );

    let response = state.tutor.exchange(&req).await;
    Ok(Json(TutorResponse { response }))
}
