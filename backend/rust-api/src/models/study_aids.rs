use serde::{Deserialize, Serialize};
use validator::Validate;

pub use super::resource::QuizQuestion;

pub const DEFAULT_PRACTICE_COUNT: u32 = 5;
pub const MAX_PRACTICE_COUNT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeQuestion {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
}

/// Resource descriptor shared by the quiz and summary calls.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAidRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "resourceTitle is required"))]
    pub resource_title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "resourceType is required"))]
    pub resource_type: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "moduleTitle is required"))]
    pub module_title: String,
    #[serde(default)]
    pub module_description: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PracticeQuestionsRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "moduleId is required"))]
    pub module_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "moduleTitle is required"))]
    pub module_title: String,
    #[serde(default)]
    pub module_description: String,
    #[serde(default)]
    pub key_concepts_preview: String,
    pub count: Option<u32>,
}

impl PracticeQuestionsRequest {
    pub fn clamped_count(&self) -> u32 {
        self.count
            .unwrap_or(DEFAULT_PRACTICE_COUNT)
            .clamp(1, MAX_PRACTICE_COUNT)
    }
}

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct PracticeQuestionsResponse {
    pub questions: Vec<PracticeQuestion>,
}
