use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{
    error::ApiResult,
    extractors::ValidatedJson,
    models::study_aids::{
        PracticeQuestionsRequest, PracticeQuestionsResponse, QuizResponse, ResourceAidRequest,
        SummaryResponse,
    },
    services::AppState,
};

/// POST /api/v1/quiz
pub async fn generate_quiz(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<ResourceAidRequest>,
) -> ApiResult<impl IntoResponse> {
    tracing::info!("Generating quiz for resource '{}'", req.resource_title);
    let questions = state.study_aids.quiz(&req).await;
    Ok(Json(QuizResponse { questions }))
}

/// POST /api/v1/summary
pub async fn generate_summary(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<ResourceAidRequest>,
) -> ApiResult<impl IntoResponse> {
    tracing::info!("Generating summary for resource '{}'", req.resource_title);
    let summary = state.study_aids.summary(&req).await;
    Ok(Json(SummaryResponse { summary }))
}

/// POST /api/v1/practice-questions
pub async fn generate_practice_questions(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<PracticeQuestionsRequest>,
) -> ApiResult<impl IntoResponse> {
    tracing::info!(
        "Generating {} practice questions for module={}",
        req.clamped_count(),
        req.module_id
    );
    let questions = state.study_aids.practice_questions(&req).await;
    Ok(Json(PracticeQuestionsResponse { questions }))
}
