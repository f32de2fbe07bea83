use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Pending,
    Active,
    Completed,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Pending => "pending",
            ModuleStatus::Active => "active",
            ModuleStatus::Completed => "completed",
        }
    }

    /// Status only moves forward (pending -> active -> completed). A completed
    /// module may be re-activated explicitly; nothing ever returns to pending.
    pub fn can_transition_to(self, next: ModuleStatus) -> bool {
        use ModuleStatus::{Active, Completed, Pending};
        matches!(
            (self, next),
            (Pending, Pending)
                | (Active, Active)
                | (Completed, Completed)
                | (Pending, Active)
                | (Active, Completed)
                | (Completed, Active)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    Important,
    Helpful,
}

impl Priority {
    /// Default by position: first two critical, next two important, rest helpful.
    pub fn for_position(index: usize) -> Self {
        match index {
            0 | 1 => Priority::Critical,
            2 | 3 => Priority::Important,
            _ => Priority::Helpful,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "critical" => Some(Priority::Critical),
            "important" => Some(Priority::Important),
            "helpful" => Some(Priority::Helpful),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: ModuleStatus,
    pub priority: Priority,
    pub estimated_time: String,
    pub key_concepts_preview: String,
    pub suggested_search_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPlan {
    #[serde(alias = "title")]
    pub plan_title: String,
    pub description: String,
    pub modules: Vec<Module>,
}

impl LearningPlan {
    /// A plan without modules counts as no plan at all.
    pub fn is_present(&self) -> bool {
        !self.modules.is_empty()
    }

    pub fn module(&self, module_id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == module_id)
    }

    pub fn module_mut(&mut self, module_id: &str) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.id == module_id)
    }
}

/// Loosely-typed plan as emitted by the model. Nothing is trusted until the
/// synthesizer has repaired it, so every field stays untyped JSON.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPlan {
    #[serde(alias = "title")]
    pub plan_title: Option<serde_json::Value>,
    pub description: Option<serde_json::Value>,
    pub modules: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedModule {
    pub id: Option<serde_json::Value>,
    pub title: Option<serde_json::Value>,
    pub description: Option<serde_json::Value>,
    pub priority: Option<serde_json::Value>,
    pub estimated_time: Option<serde_json::Value>,
    pub key_concepts_preview: Option<serde_json::Value>,
    pub suggested_search_keywords: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanRequest {
    #[serde(default, alias = "examGoal")]
    #[validate(length(min = 1, message = "Goal is required"))]
    pub goal: String,
    #[serde(default)]
    pub prior_knowledge: String,
    #[serde(default)]
    pub time_constraint: String,
    #[serde(default)]
    pub syllabus_content: String,
}

impl GeneratePlanRequest {
    pub fn time_constraint_or_default(&self) -> &str {
        let trimmed = self.time_constraint.trim();
        if trimmed.is_empty() {
            "24 hours"
        } else {
            trimmed
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanResponse {
    pub learning_plan: LearningPlan,
}

#[derive(Debug, Deserialize)]
pub struct UpdateModuleStatusRequest {
    pub status: ModuleStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_are_monotonic() {
        use ModuleStatus::{Active, Completed, Pending};
        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Active));
        assert!(!Active.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn positional_priorities() {
        let priorities: Vec<_> = (0..6).map(Priority::for_position).collect();
        assert_eq!(
            priorities,
            vec![
                Priority::Critical,
                Priority::Critical,
                Priority::Important,
                Priority::Important,
                Priority::Helpful,
                Priority::Helpful,
            ]
        );
    }

    #[test]
    fn plan_request_accepts_exam_goal_alias() {
        let req: GeneratePlanRequest =
            serde_json::from_str(r#"{"examGoal": "SQL interview"}"#).unwrap();
        assert_eq!(req.goal, "SQL interview");
        assert_eq!(req.time_constraint_or_default(), "24 hours");
    }
}
