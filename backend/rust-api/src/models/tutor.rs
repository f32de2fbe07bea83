use serde::{Deserialize, Serialize};
use validator::Validate;

use super::chat::HistoryEntry;
use super::resource::ResourceKind;

/// Module context supplied with a tutoring exchange.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleContext {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Resource the learner is currently working through.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceContext {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub title: String,
    #[serde(default)]
    pub consumed: bool,
    // legacy flags used by older clients
    #[serde(default)]
    pub watched: bool,
    #[serde(default)]
    pub read: bool,
}

impl ResourceContext {
    pub fn is_consumed(&self) -> bool {
        self.consumed || self.watched || self.read
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TutorRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
    #[serde(default)]
    pub chat_history: Vec<HistoryEntry>,
    pub active_module: Option<ModuleContext>,
    #[serde(default)]
    pub is_document_mode: bool,
    #[serde(default)]
    pub document_content: String,
    pub active_resource: Option<ResourceContext>,
}

#[derive(Debug, Serialize)]
pub struct TutorResponse {
    pub response: String,
}

/// Context framing a tutoring exchange. Document study wins over an active
/// module, which wins over general goal-setting.
#[derive(Debug, Clone, PartialEq)]
pub enum TutoringMode {
    Document {
        content: String,
    },
    Module {
        module: ModuleContext,
        resource: Option<ResourceContext>,
    },
    General,
}

impl TutoringMode {
    pub fn select(
        document: Option<&str>,
        module: Option<ModuleContext>,
        resource: Option<ResourceContext>,
    ) -> Self {
        match (document, module) {
            (Some(content), _) => TutoringMode::Document {
                content: content.to_string(),
            },
            (None, Some(module)) => TutoringMode::Module { module, resource },
            (None, None) => TutoringMode::General,
        }
    }

    pub fn from_request(req: &TutorRequest) -> Self {
        let document = req
            .is_document_mode
            .then_some(req.document_content.as_str());
        Self::select(
            document,
            req.active_module.clone(),
            req.active_resource.clone(),
        )
    }

    pub fn active_module(&self) -> Option<&ModuleContext> {
        match self {
            TutoringMode::Module { module, .. } => Some(module),
            _ => None,
        }
    }
}
