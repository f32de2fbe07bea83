use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    extractors::ValidatedJson,
    models::plan::{GeneratePlanRequest, GeneratePlanResponse, LearningPlan},
    services::AppState,
};

pub(crate) async fn plan_for(state: &AppState, req: &GeneratePlanRequest) -> ApiResult<LearningPlan> {
    if req.goal.trim().is_empty() {
        return Err(ApiError::bad_request("Goal is required"));
    }
    Ok(state.planner.synthesize(req).await)
}

/// POST /api/v1/plans
pub async fn generate_plan(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<GeneratePlanRequest>,
) -> ApiResult<impl IntoResponse> {
    tracing::info!(
        "Generating plan: goal={}, time_constraint={}",
        req.goal,
        req.time_constraint_or_default()
    );

    let learning_plan = plan_for(&state, &req).await?;
    Ok(Json(GeneratePlanResponse { learning_plan }))
}
