use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::ApiResult,
    extractors::{AppJson, ValidatedJson},
    handlers::plans::plan_for,
    models::{
        chat::{ChatMessage, HistoryEntry},
        document::DocumentModeRequest,
        plan::{GeneratePlanRequest, UpdateModuleStatusRequest},
        study_aids::ResourceAidRequest,
        ChatExchangeResponse, ChatRequest, ModuleResourcesResponse, ResourceActionResponse,
    },
    services::{
        progress_service::compute_progress,
        resource_service::ModuleQuery,
        study_state::{current_history, SessionError, StudyState},
        tutor_service::APOLOGY,
        AppState,
    },
};

/// GET /api/v1/session
pub async fn get_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.study.read().await.view())
}

/// DELETE /api/v1/session
pub async fn reset_session(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    state.study.write().await.reset();
    state.countdown.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/session/plan
///
/// Generates a plan, starts a fresh countdown and installs the plan in the
/// session. A countdown failure leaves the previous session untouched.
pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<GeneratePlanRequest>,
) -> ApiResult<impl IntoResponse> {
    let plan = plan_for(&state, &req).await?;

    let countdown = state
        .countdown
        .start(req.time_constraint_or_default(), Utc::now())
        .await?;

    let view = {
        let mut study = state.study.write().await;
        study.install_plan(&req, plan);
        study.view()
    };
    tracing::info!(
        "Session plan created: modules={}, countdown_end={}",
        view.learning_plan.as_ref().map(|p| p.modules.len()).unwrap_or(0),
        countdown.end_at
    );

    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /api/v1/session/modules/{id}/activate
pub async fn activate_module(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let mut study = state.study.write().await;
    let module = study.activate_module(&module_id)?.clone();
    Ok(Json(module))
}

/// PUT /api/v1/session/modules/{id}/status
pub async fn update_module_status(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
    AppJson(req): AppJson<UpdateModuleStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut study = state.study.write().await;
    let module = study.update_module_status(&module_id, req.status)?.clone();
    Ok(Json(module))
}

/// POST /api/v1/session/modules/{id}/resources
///
/// Discovery runs without holding the session lock. The result is only
/// stored if no newer fetch started and the module is still active.
pub async fn fetch_module_resources(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (ticket, module) = {
        let mut study = state.study.write().await;
        let ticket = study.begin_resource_fetch(&module_id)?;
        (ticket, study.module(&module_id)?.clone())
    };

    let query = ModuleQuery {
        module_id: &module.id,
        module_title: &module.title,
        module_description: &module.description,
        keywords: &module.suggested_search_keywords,
    };
    let resources = state.resources.resources_for_module(&query).await;

    let applied = state
        .study
        .write()
        .await
        .complete_resource_fetch(&ticket, resources.clone());

    Ok(Json(ModuleResourcesResponse {
        module_id,
        applied,
        resources,
    }))
}

/// POST /api/v1/session/resources/{id}/select
pub async fn select_resource(
    State(state): State<Arc<AppState>>,
    Path(resource_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (resource, message) = state.study.write().await.select_resource(&resource_id)?;
    Ok(Json(ResourceActionResponse { resource, message }))
}

fn aid_request(study: &StudyState, resource_id: &str) -> Result<ResourceAidRequest, SessionError> {
    let (module, resource) = study.resource(resource_id)?;
    Ok(ResourceAidRequest {
        resource_title: resource.title.clone(),
        resource_type: resource.kind().as_str().to_string(),
        module_title: module.title.clone(),
        module_description: module.description.clone(),
    })
}

/// POST /api/v1/session/resources/{id}/complete
pub async fn complete_resource(
    State(state): State<Arc<AppState>>,
    Path(resource_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let req = aid_request(&*state.study.read().await, &resource_id)?;
    let summary = state.study_aids.summary(&req).await;

    let (resource, message) = state
        .study
        .write()
        .await
        .complete_resource(&resource_id, summary)?;
    tracing::info!("Resource {} marked as consumed", resource_id);

    Ok(Json(ResourceActionResponse { resource, message }))
}

/// POST /api/v1/session/resources/{id}/quiz
pub async fn quiz_resource(
    State(state): State<Arc<AppState>>,
    Path(resource_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let req = aid_request(&*state.study.read().await, &resource_id)?;
    let questions = state.study_aids.quiz(&req).await;

    let (resource, message) = state
        .study
        .write()
        .await
        .attach_quiz(&resource_id, questions)?;

    Ok(Json(ResourceActionResponse { resource, message }))
}

/// GET /api/v1/session/chat
pub async fn get_chat(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let study = state.study.read().await;
    Json(current_history(&study).to_vec())
}

/// POST /api/v1/session/chat
///
/// The reply is stored with the module that was active when the message
/// was sent. Failed generation posts the apology instead.
pub async fn send_chat(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<ChatRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_message = ChatMessage::user(req.message.clone());

    let (module_id, mode, topic, history) = {
        let mut study = state.study.write().await;
        let history: Vec<HistoryEntry> = current_history(&study)
            .iter()
            .map(HistoryEntry::from)
            .collect();
        study.append(user_message.clone());
        (
            study.active_module_id().map(str::to_string),
            study.tutoring_mode(),
            study.active_module().map(|m| m.title.clone()),
            history,
        )
    };

    let content = match state
        .tutor
        .reply(&mode, topic.as_deref(), &history, &req.message)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!("Session chat failed: {}", e);
            APOLOGY.to_string()
        }
    };

    let assistant_message = ChatMessage::assistant(content);
    state
        .study
        .write()
        .await
        .append_for(module_id.as_deref(), assistant_message.clone());

    Ok(Json(ChatExchangeResponse {
        user_message,
        assistant_message,
    }))
}

/// DELETE /api/v1/session/chat
pub async fn clear_chat(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.study.write().await.clear_current_history();
    StatusCode::NO_CONTENT
}

/// PUT /api/v1/session/document
pub async fn set_document_mode(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<DocumentModeRequest>,
) -> impl IntoResponse {
    let mut study = state.study.write().await;
    study.set_document_mode(req.enabled, &req.content);
    Json(study.view())
}

/// GET /api/v1/session/progress
pub async fn get_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let study = state.study.read().await;
    Json(compute_progress(study.plan()))
}
