use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::metrics;
use crate::models::plan::{
    GeneratePlanRequest, GeneratedModule, GeneratedPlan, LearningPlan, Module, ModuleStatus,
    Priority,
};
use crate::services::llm_client::TextGenerator;
use crate::utils::json::parse_object;

pub const DEFAULT_ESTIMATED_TIME: &str = "30-45 minutes";

/// Turns a goal into a study plan that always satisfies the module
/// invariants: at least one module, only the first active, every field
/// populated.
pub struct PlanSynthesizer {
    llm: Arc<dyn TextGenerator>,
}

impl PlanSynthesizer {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    pub async fn synthesize(&self, req: &GeneratePlanRequest) -> LearningPlan {
        let goal = req.goal.trim();
        tracing::info!(
            "Generating study plan: goal={}, time={}, syllabus={}",
            goal,
            req.time_constraint_or_default(),
            !req.syllabus_content.trim().is_empty()
        );

        let text = match self.llm.generate(&build_prompt(req)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Plan generation failed, using fallback plan: {}", e);
                return fallback(req);
            }
        };

        let generated = match parse_object::<GeneratedPlan>(&text) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("Plan response was not valid JSON ({}), using fallback plan", e);
                return fallback(req);
            }
        };

        match repair(generated, req) {
            Some(plan) => {
                tracing::info!("Plan generated with {} modules", plan.modules.len());
                metrics::record_plan("model");
                plan
            }
            None => {
                tracing::warn!("Plan response had no modules, using fallback plan");
                fallback(req)
            }
        }
    }
}

fn build_prompt(req: &GeneratePlanRequest) -> String {
    let time = req.time_constraint_or_default();
    let prior = if req.prior_knowledge.trim().is_empty() {
        "Not provided"
    } else {
        req.prior_knowledge.trim()
    };
    let syllabus = match req.syllabus_content.trim() {
        "" => String::new(),
        content => format!("SYLLABUS CONTENT: {}\n", content),
    };

    format!(
        r#"You are an expert exam preparation AI that creates last-minute study plans tailored to urgent exam needs.

EXAM/INTERVIEW GOAL: {goal}
TIME CONSTRAINT: {time}
PRIOR KNOWLEDGE: {prior}
{syllabus}
INSTRUCTIONS FOR CREATING THE EXAM PREPARATION PLAN:
1. Create a structured study plan with at least 3 modules prioritized for the limited time available ({time}).
2. Assign each module a priority level: "critical" (must know), "important" (should know), or "helpful" (if time permits).
3. Estimate study time for each module based on complexity and the total time constraint.
4. For each module, provide 4-6 specific search keywords that will help find relevant educational resources.
5. Include a brief list of key concepts that will be covered in each module.
6. Ensure the plan focuses on the most exam-relevant content first.

IMPORTANT GUIDELINES:
- Focus on breadth over depth given the time constraint
- Prioritize concepts most likely to appear on the exam/interview
- If syllabus content is provided, align modules directly with it
- Keep descriptions concise and actionable

Return the exam preparation plan as a JSON object with the following structure:
{{
  "planTitle": "Rapid Revision Plan for [EXAM NAME]",
  "description": "A focused study plan designed for [TIME CONSTRAINT] preparation",
  "modules": [
    {{
      "id": "module-1",
      "title": "Module Title",
      "description": "Concise description of what will be covered",
      "priority": "critical",
      "estimatedTime": "45 minutes",
      "keyConceptsPreview": "Key concept 1, Key concept 2, Key concept 3",
      "suggestedSearchKeywords": ["specific keyword 1", "specific keyword 2", "specific keyword 3", "specific keyword 4"]
    }}
  ]
}}

Only return the JSON object, nothing else. Ensure the JSON is valid and properly formatted."#,
        goal = req.goal.trim(),
    )
}

/// Scalar JSON value as trimmed, non-empty text.
fn text(value: Option<&Value>) -> Option<String> {
    let raw = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!raw.is_empty()).then_some(raw)
}

fn key_concepts(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| text(Some(v)))
            .collect::<Vec<_>>()
            .join(", "),
        other => text(other).unwrap_or_default(),
    }
}

fn keywords(value: Option<&Value>, title: &str) -> Vec<String> {
    let parsed: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(|v| text(Some(v))).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    if parsed.is_empty() {
        default_keywords(title)
    } else {
        parsed
    }
}

pub fn default_keywords(title: &str) -> Vec<String> {
    vec![
        title.to_string(),
        format!("{} exam questions", title),
        format!("{} practice problems", title),
        format!("{} quick tutorial", title),
    ]
}

fn status_for(index: usize) -> ModuleStatus {
    if index == 0 {
        ModuleStatus::Active
    } else {
        ModuleStatus::Pending
    }
}

fn repair_module(
    index: usize,
    raw: GeneratedModule,
    millis: i64,
    seen: &mut HashSet<String>,
) -> Module {
    let title = text(raw.title.as_ref()).unwrap_or_else(|| format!("Module {}", index + 1));

    let base = text(raw.id.as_ref()).unwrap_or_else(|| format!("module-{}-{}", index + 1, millis));
    let mut id = base.clone();
    let mut suffix = index + 1;
    while !seen.insert(id.clone()) {
        id = format!("{}-{}", base, suffix);
        suffix += 1;
    }

    let priority = text(raw.priority.as_ref())
        .and_then(|p| Priority::parse(&p))
        .unwrap_or_else(|| Priority::for_position(index));

    Module {
        id,
        description: text(raw.description.as_ref()).unwrap_or_default(),
        status: status_for(index),
        priority,
        estimated_time: text(raw.estimated_time.as_ref())
            .unwrap_or_else(|| DEFAULT_ESTIMATED_TIME.to_string()),
        key_concepts_preview: key_concepts(raw.key_concepts_preview.as_ref()),
        suggested_search_keywords: keywords(raw.suggested_search_keywords.as_ref(), &title),
        title,
    }
}

/// `None` when the response has no usable module list.
fn repair(generated: GeneratedPlan, req: &GeneratePlanRequest) -> Option<LearningPlan> {
    let items = match generated.modules {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => return None,
    };

    let millis = Utc::now().timestamp_millis();
    let mut seen = HashSet::new();
    let modules = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let raw = serde_json::from_value::<GeneratedModule>(item).unwrap_or_default();
            repair_module(index, raw, millis, &mut seen)
        })
        .collect();

    let goal = req.goal.trim();
    Some(LearningPlan {
        plan_title: text(generated.plan_title.as_ref())
            .unwrap_or_else(|| format!("{} Rapid Revision Plan", goal)),
        description: text(generated.description.as_ref()).unwrap_or_else(|| {
            format!(
                "Focused study plan for {} with {} time available.",
                goal,
                req.time_constraint_or_default()
            )
        }),
        modules,
    })
}

/// Core Concepts, Common Problems, Advanced Topics.
pub fn fallback(req: &GeneratePlanRequest) -> LearningPlan {
    metrics::record_fallback("plan");
    metrics::record_plan("fallback");

    let goal = req.goal.trim();
    let millis = Utc::now().timestamp_millis();

    let module = |index: usize,
                  title: &str,
                  description: String,
                  priority: Priority,
                  estimated_time: &str,
                  concepts: &str,
                  keywords: Vec<String>| Module {
        id: format!("module-{}-{}", index + 1, millis),
        title: title.to_string(),
        description,
        status: status_for(index),
        priority,
        estimated_time: estimated_time.to_string(),
        key_concepts_preview: concepts.to_string(),
        suggested_search_keywords: keywords,
    };

    LearningPlan {
        plan_title: format!("{} Rapid Revision Plan", goal),
        description: format!(
            "Focused study plan for {} with {} time available.",
            goal,
            req.time_constraint_or_default()
        ),
        modules: vec![
            module(
                0,
                "Core Concepts",
                format!("Essential concepts for {} that you must master", goal),
                Priority::Critical,
                "60 minutes",
                "Fundamental principles and key definitions",
                vec![
                    goal.to_string(),
                    format!("{} basics", goal),
                    format!("{} core concepts", goal),
                ],
            ),
            module(
                1,
                "Common Problems",
                "Typical problems and their solutions".to_string(),
                Priority::Important,
                "45 minutes",
                "Problem-solving techniques and common challenges",
                vec![
                    format!("{} problems", goal),
                    format!("{} examples", goal),
                    format!("{} practice", goal),
                ],
            ),
            module(
                2,
                "Advanced Topics",
                "More complex aspects if time permits".to_string(),
                Priority::Helpful,
                "30 minutes",
                "Advanced applications and edge cases",
                vec![
                    format!("{} advanced", goal),
                    format!("{} expert level", goal),
                    format!("{} deep dive", goal),
                ],
            ),
        ],
    }
}
