//! In-process study session.
//!
//! One [`StudyState`] holds the goal, plan, per-module chat transcripts and
//! discovered resources. Every mutation goes through a method here; the
//! HTTP layer only locks, calls, and releases.

use std::collections::HashMap;

use thiserror::Error;

use crate::metrics;
use crate::models::chat::{ChatMessage, ChatRole};
use crate::models::plan::{GeneratePlanRequest, LearningPlan, Module, ModuleStatus};
use crate::models::resource::{QuizQuestion, Resource, ResourceKind};
use crate::models::tutor::{ModuleContext, ResourceContext, TutoringMode};
use crate::models::SessionView;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no study plan has been created")]
    NoPlan,

    #[error("module '{0}' does not exist")]
    UnknownModule(String),

    #[error("resource '{0}' does not exist for the active module")]
    UnknownResource(String),

    #[error("module status cannot change from {from} to {to}")]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("no module is active")]
    NoActiveModule,
}

/// Issued when a resource fetch starts; the result is applied only if this
/// is still the newest ticket and its module is still active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub module_id: String,
    pub generation: u64,
}

/// "Current" transcript: the active module's history, or nothing.
pub fn current_history(state: &StudyState) -> &[ChatMessage] {
    state
        .active_module_id
        .as_ref()
        .and_then(|id| state.histories.get(id))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[derive(Debug, Default)]
pub struct StudyState {
    goal: String,
    prior_knowledge: String,
    time_constraint: String,
    plan: Option<LearningPlan>,
    active_module_id: Option<String>,
    active_resource_id: Option<String>,
    histories: HashMap<String, Vec<ChatMessage>>,
    resources: HashMap<String, Vec<Resource>>,
    document_mode: bool,
    document_content: String,
    fetch_generation: u64,
    latest_fetch: Option<FetchTicket>,
}

impl StudyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_constraint(&self) -> &str {
        &self.time_constraint
    }

    /// Plan, if one with at least one module is installed.
    pub fn plan(&self) -> Option<&LearningPlan> {
        self.plan.as_ref().filter(|p| p.is_present())
    }

    pub fn active_module(&self) -> Option<&Module> {
        let id = self.active_module_id.as_deref()?;
        self.plan()?.module(id)
    }

    pub fn module(&self, module_id: &str) -> Result<&Module, SessionError> {
        self.plan()
            .ok_or(SessionError::NoPlan)?
            .module(module_id)
            .ok_or_else(|| SessionError::UnknownModule(module_id.to_string()))
    }

    pub fn module_resources(&self, module_id: &str) -> &[Resource] {
        self.resources
            .get(module_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn active_resource(&self) -> Option<&Resource> {
        let module_id = self.active_module_id.as_deref()?;
        let resource_id = self.active_resource_id.as_deref()?;
        self.module_resources(module_id)
            .iter()
            .find(|r| r.id == resource_id)
    }

    /// Resource of the active module, with the module it belongs to.
    pub fn resource(&self, resource_id: &str) -> Result<(&Module, &Resource), SessionError> {
        let module = self.active_module().ok_or(SessionError::NoActiveModule)?;
        let resource = self
            .module_resources(&module.id)
            .iter()
            .find(|r| r.id == resource_id)
            .ok_or_else(|| SessionError::UnknownResource(resource_id.to_string()))?;
        Ok((module, resource))
    }

    pub fn document_content(&self) -> Option<&str> {
        self.document_mode.then_some(self.document_content.as_str())
    }

    /// Replaces any previous plan. Transcripts and resources of the old plan
    /// are discarded and in-flight resource fetches become stale.
    pub fn install_plan(&mut self, req: &GeneratePlanRequest, plan: LearningPlan) {
        self.goal = req.goal.trim().to_string();
        self.prior_knowledge = req.prior_knowledge.clone();
        self.time_constraint = req.time_constraint_or_default().to_string();
        self.histories.clear();
        self.resources.clear();
        self.active_resource_id = None;
        self.invalidate_fetches();

        tracing::info!(
            "Study plan installed: goal={}, modules={}",
            self.goal,
            plan.modules.len()
        );

        self.active_module_id = plan.modules.first().map(|m| m.id.clone());
        let announcement = plan_created_message(&self.goal, req, &plan);
        self.plan = Some(plan);
        self.append(ChatMessage::assistant(announcement));
    }

    /// Start a new plan: everything goes, including document mode.
    pub fn reset(&mut self) {
        let generation = self.fetch_generation;
        *self = Self::default();
        self.fetch_generation = generation + 1;
        tracing::info!("Study session reset");
    }

    /// Selects a module for study. A pending module becomes active; a
    /// completed one keeps its status.
    pub fn activate_module(&mut self, module_id: &str) -> Result<&Module, SessionError> {
        let plan = self.plan.as_mut().filter(|p| p.is_present()).ok_or(SessionError::NoPlan)?;
        let module = plan
            .module_mut(module_id)
            .ok_or_else(|| SessionError::UnknownModule(module_id.to_string()))?;

        if module.status == ModuleStatus::Pending {
            module.status = ModuleStatus::Active;
        }

        if self.active_module_id.as_deref() != Some(module_id) {
            self.active_resource_id = None;
        }
        self.active_module_id = Some(module_id.to_string());
        tracing::debug!("Active module set to {}", module_id);

        self.module(module_id)
    }

    pub fn update_module_status(
        &mut self,
        module_id: &str,
        status: ModuleStatus,
    ) -> Result<&Module, SessionError> {
        let plan = self.plan.as_mut().filter(|p| p.is_present()).ok_or(SessionError::NoPlan)?;
        let module = plan
            .module_mut(module_id)
            .ok_or_else(|| SessionError::UnknownModule(module_id.to_string()))?;

        if !module.status.can_transition_to(status) {
            return Err(SessionError::IllegalTransition {
                from: module.status.as_str(),
                to: status.as_str(),
            });
        }

        tracing::info!(
            "Module {} status {} -> {}",
            module_id,
            module.status.as_str(),
            status.as_str()
        );
        module.status = status;
        Ok(module)
    }

    pub fn begin_resource_fetch(&mut self, module_id: &str) -> Result<FetchTicket, SessionError> {
        self.module(module_id)?;
        self.fetch_generation += 1;
        let ticket = FetchTicket {
            module_id: module_id.to_string(),
            generation: self.fetch_generation,
        };
        self.latest_fetch = Some(ticket.clone());
        Ok(ticket)
    }

    /// Stores fetched resources if the ticket is still current. Returns
    /// whether they were applied.
    pub fn complete_resource_fetch(&mut self, ticket: &FetchTicket, resources: Vec<Resource>) -> bool {
        if self.latest_fetch.as_ref() != Some(ticket) {
            tracing::warn!(
                "Discarding resources for module={} (generation {} superseded)",
                ticket.module_id,
                ticket.generation
            );
            metrics::record_stale_fetch("superseded");
            return false;
        }

        if self.active_module_id.as_deref() != Some(ticket.module_id.as_str()) {
            tracing::warn!(
                "Discarding resources for module={} (no longer active)",
                ticket.module_id
            );
            metrics::record_stale_fetch("inactive_module");
            return false;
        }

        self.latest_fetch = None;
        self.active_resource_id = None;
        self.resources.insert(ticket.module_id.clone(), resources);
        true
    }

    /// Appends to the active module's transcript. Without an active module
    /// the message is not retained and `false` is returned.
    pub fn append(&mut self, message: ChatMessage) -> bool {
        let module_id = self.active_module_id.clone();
        self.append_for(module_id.as_deref(), message)
    }

    /// Appends to a specific module's transcript, used when a reply arrives
    /// after the learner may have switched modules.
    pub fn append_for(&mut self, module_id: Option<&str>, message: ChatMessage) -> bool {
        let role = match message.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        metrics::record_chat_message(role);

        match module_id.filter(|id| self.plan().is_some_and(|p| p.module(id).is_some())) {
            Some(module_id) => {
                self.histories
                    .entry(module_id.to_string())
                    .or_default()
                    .push(message);
                true
            }
            None => false,
        }
    }

    pub fn active_module_id(&self) -> Option<&str> {
        self.active_module_id.as_deref()
    }

    pub fn clear_current_history(&mut self) {
        if let Some(id) = &self.active_module_id {
            self.histories.remove(id);
        }
    }

    pub fn set_document_mode(&mut self, enabled: bool, content: &str) {
        self.document_mode = enabled;
        if !content.is_empty() {
            self.document_content = content.to_string();
        }
        tracing::info!(
            "Document mode {} ({} chars)",
            if enabled { "enabled" } else { "disabled" },
            self.document_content.len()
        );
    }

    /// Keeps uploaded text for later use; document mode is left as is.
    pub fn load_document(&mut self, content: &str) {
        self.document_content = content.to_string();
    }

    pub fn tutoring_mode(&self) -> TutoringMode {
        let module = self.active_module().map(|m| ModuleContext {
            title: m.title.clone(),
            description: m.description.clone(),
        });
        let resource = self.active_resource().map(|r| ResourceContext {
            id: r.id.clone(),
            kind: r.kind(),
            title: r.title.clone(),
            consumed: r.consumed,
            watched: false,
            read: false,
        });

        TutoringMode::select(self.document_content(), module, resource)
    }

    pub fn select_resource(&mut self, resource_id: &str) -> Result<(Resource, ChatMessage), SessionError> {
        let (module, resource) = self.resource(resource_id)?;
        let resource = resource.clone();
        let content = match resource.kind() {
            ResourceKind::Video => format!(
                "I've found a helpful video about {}: \"{}\". Watch it to learn more about this topic, and I can answer any questions you have afterward or quiz you on the content.",
                module.title, resource.title
            ),
            ResourceKind::Article => format!(
                "I've found a useful article about {}: \"{}\". Read it to deepen your understanding, and I can answer any questions you have afterward or quiz you on the content.",
                module.title, resource.title
            ),
        };

        self.active_resource_id = Some(resource.id.clone());
        let message = ChatMessage::assistant(content);
        self.append(message.clone());
        Ok((resource, message))
    }

    /// Marks the resource watched/read and records its summary.
    pub fn complete_resource(
        &mut self,
        resource_id: &str,
        summary: String,
    ) -> Result<(Resource, ChatMessage), SessionError> {
        let module_title = self.resource(resource_id)?.0.title.clone();
        let resource = self.resource_mut(resource_id)?;
        resource.consumed = true;
        resource.summary = Some(summary.clone());
        let resource = resource.clone();

        let activity = match resource.kind() {
            ResourceKind::Video => "watching the video",
            ResourceKind::Article => "reading the article",
        };
        let message = ChatMessage::assistant(format!(
            "Great! Now that you've finished {} about {}, let me summarize the key points:\n\n{}\n\nWould you like me to quiz you on the content to reinforce your learning?",
            activity, module_title, summary
        ));
        self.append(message.clone());
        Ok((resource, message))
    }

    pub fn attach_quiz(
        &mut self,
        resource_id: &str,
        questions: Vec<QuizQuestion>,
    ) -> Result<(Resource, ChatMessage), SessionError> {
        let resource = self.resource_mut(resource_id)?;
        resource.quiz_questions = Some(questions);
        let resource = resource.clone();

        let message = ChatMessage::assistant(format!(
            "Here's your quiz on {}:\n\n{}\n\nTake your time to answer these questions. The correct answers are marked with ✓ so you can check your understanding.",
            resource.title,
            format_quiz(resource.quiz_questions.as_deref().unwrap_or_default())
        ));
        self.append(message.clone());
        Ok((resource, message))
    }

    fn resource_mut(&mut self, resource_id: &str) -> Result<&mut Resource, SessionError> {
        let module_id = self
            .active_module()
            .map(|m| m.id.clone())
            .ok_or(SessionError::NoActiveModule)?;
        self.resources
            .get_mut(&module_id)
            .and_then(|list| list.iter_mut().find(|r| r.id == resource_id))
            .ok_or_else(|| SessionError::UnknownResource(resource_id.to_string()))
    }

    fn invalidate_fetches(&mut self) {
        self.fetch_generation += 1;
        self.latest_fetch = None;
    }

    pub fn view(&self) -> SessionView {
        let active_module_id = self.active_module().map(|m| m.id.clone());
        let resources = active_module_id
            .as_deref()
            .map(|id| self.module_resources(id).to_vec())
            .unwrap_or_default();

        SessionView {
            goal: self.goal.clone(),
            prior_knowledge: self.prior_knowledge.clone(),
            time_constraint: self.time_constraint.clone(),
            learning_plan: self.plan().cloned(),
            active_module_id,
            active_resource_id: self.active_resource().map(|r| r.id.clone()),
            resources,
            chat_history: current_history(self).to_vec(),
            is_document_mode: self.document_mode,
            has_document: !self.document_content.is_empty(),
        }
    }
}

fn plan_created_message(goal: &str, req: &GeneratePlanRequest, plan: &LearningPlan) -> String {
    let time = match req.time_constraint.trim() {
        "" => "with limited time".to_string(),
        t => format!("with only {} available", t),
    };

    format!(
        "🚨 **Rapid Revision Plan Created!** 🚨\n\n\
         I've created a focused exam prep plan for your **{}** {}.\n\n\
         The plan has {} modules prioritized by importance:\n\
         - 🔴 **Critical** - Must know for the exam\n\
         - 🟠 **Important** - High-value concepts\n\
         - 🟡 **Helpful** - Cover if time permits\n\n\
         Click on any module to start studying. Let's start with the highest priority module!",
        goal,
        time,
        plan.modules.len()
    )
}

/// Questions with lettered options; the correct one carries a ✓.
pub fn format_quiz(questions: &[QuizQuestion]) -> String {
    questions
        .iter()
        .enumerate()
        .map(|(index, q)| {
            let options = q
                .options
                .iter()
                .enumerate()
                .map(|(i, opt)| {
                    let letter = (b'A' + (i as u8 % 26)) as char;
                    let mark = if i == q.correct_answer { " ✓" } else { "" };
                    format!("{}. {}{}", letter, opt, mark)
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("**Question {}**: {}\n{}", index + 1, q.question, options)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
