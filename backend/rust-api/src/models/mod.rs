use serde::{Deserialize, Serialize};
use validator::Validate;

use self::chat::ChatMessage;
use self::plan::LearningPlan;
use self::resource::Resource;

pub mod chat;
pub mod document;
pub mod plan;
pub mod resource;
pub mod study_aids;
pub mod timer;
pub mod tutor;

/// Snapshot of the study session returned by `GET /api/v1/session`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub goal: String,
    pub prior_knowledge: String,
    pub time_constraint: String,
    pub learning_plan: Option<LearningPlan>,
    pub active_module_id: Option<String>,
    pub active_resource_id: Option<String>,
    pub resources: Vec<Resource>,
    pub chat_history: Vec<ChatMessage>,
    pub is_document_mode: bool,
    pub has_document: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub total_modules: usize,
    pub completed_modules: usize,
    pub critical_modules: usize,
    pub completed_critical_modules: usize,
    pub completion_percentage: u32,
    pub critical_completion_percentage: u32,
    pub time_spent_hours: f64,
    pub time_remaining_hours: f64,
    pub total_time_hours: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExchangeResponse {
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleResourcesResponse {
    pub module_id: String,
    /// False when the module stopped being active before discovery finished.
    pub applied: bool,
    pub resources: Vec<Resource>,
}

/// Resource after a lifecycle step, with the assistant message it produced.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceActionResponse {
    pub resource: Resource,
    pub message: ChatMessage,
}
