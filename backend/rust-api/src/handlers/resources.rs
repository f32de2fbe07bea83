use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{
    error::ApiResult,
    extractors::ValidatedJson,
    models::resource::{DiscoverResourcesRequest, DiscoverResourcesResponse},
    services::{resource_service::ModuleQuery, AppState},
};

/// POST /api/v1/resources
pub async fn discover_resources(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<DiscoverResourcesRequest>,
) -> ApiResult<impl IntoResponse> {
    let query = ModuleQuery {
        module_id: &req.module_id,
        module_title: &req.module_title,
        module_description: &req.module_description,
        keywords: &req.search_keywords,
    };

    let resources = state.resources.resources_for_module(&query).await;
    tracing::info!(
        "Discovered {} resources for module={}",
        resources.len(),
        req.module_id
    );

    Ok(Json(DiscoverResourcesResponse { resources }))
}
