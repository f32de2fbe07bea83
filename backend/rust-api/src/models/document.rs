use serde::{Deserialize, Serialize};
use validator::Validate;

pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;
/// Request body cap for uploads: a base64-encoded maximum-size document plus
/// room for the JSON envelope.
pub const MAX_UPLOAD_BODY_BYTES: usize = MAX_DOCUMENT_BYTES.div_ceil(3) * 4 + 64 * 1024;
pub const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadDocumentRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "fileName is required"))]
    pub file_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "contentBase64 is required"))]
    pub content_base64: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDocumentResponse {
    pub file_name: String,
    pub file_size: usize,
    pub content_preview: String,
    pub processed_content: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentModeRequest {
    pub enabled: bool,
    #[serde(default)]
    pub content: String,
}
