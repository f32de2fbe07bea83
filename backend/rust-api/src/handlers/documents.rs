use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{
    error::ApiResult,
    extractors::ValidatedJson,
    models::document::{UploadDocumentRequest, UploadDocumentResponse},
    services::AppState,
};

/// POST /api/v1/documents
///
/// The extracted text is kept in the session so document mode can be
/// switched on afterwards without re-sending it.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<UploadDocumentRequest>,
) -> ApiResult<impl IntoResponse> {
    let document = state
        .documents
        .process(&req.file_name, &req.content_base64)
        .await?;

    state.study.write().await.load_document(&document.text);

    Ok(Json(UploadDocumentResponse {
        content_preview: document.preview(),
        file_name: document.file_name,
        file_size: document.file_size,
        processed_content: document.processed_content,
    }))
}
