use std::sync::Arc;

use crate::models::chat::HistoryEntry;
use crate::models::resource::Resource;
use crate::models::tutor::{TutorRequest, TutoringMode};
use crate::services::llm_client::{LlmError, TextGenerator};
use crate::services::resource_service::ResourceService;

pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

const VIDEO_REQUEST_LIMIT: usize = 3;
const VIDEO_WORDS: [&str; 4] = ["youtube", "video", "videos", "watch"];
const REQUEST_PHRASES: [&str; 5] = ["show me", "give me", "can you", "i want", "get"];

/// "Show me a video..." style messages.
pub fn is_video_request(message: &str) -> bool {
    let lower = message.to_lowercase();
    VIDEO_WORDS.iter().any(|w| lower.contains(w))
        && REQUEST_PHRASES.iter().any(|p| lower.contains(p))
}

pub fn system_prompt(mode: &TutoringMode) -> String {
    match mode {
        TutoringMode::Document { content } => format!(
            r#"You are an expert learning companion AI that helps users understand documents and study materials.

DOCUMENT CONTENT:
{content}

Your role is to:
1. Answer questions about the document content
2. Explain concepts from the document in a clear, concise manner
3. Generate quiz questions from the document content if requested
4. Summarize sections of the document if asked

Only reference information that is present in the document. If asked about something not in the document,
politely explain that the information isn't in the current document.

Be helpful, accurate, and educational in your responses."#
        ),
        TutoringMode::Module { module, resource } => {
            let resource_block = resource
                .as_ref()
                .map(|r| {
                    format!(
                        "\nACTIVE RESOURCE: {} ({})\nRESOURCE STATUS: {}\n",
                        r.title,
                        r.kind.noun(),
                        r.kind.consumed_label(r.is_consumed())
                    )
                })
                .unwrap_or_default();
            let resource_steps = if resource.is_some() {
                "\n6. Reference and discuss the active resource when relevant\n7. If the user has watched/read the resource, help them apply what they learned"
            } else {
                ""
            };

            format!(
                r#"You are a friendly and concise learning companion helping with the module: "{title}"

CURRENT MODULE: {title}
MODULE DESCRIPTION: {description}
{resource_block}
CONVERSATION GUIDELINES:
1. **Be Concise:** Keep explanations brief (2-3 sentences per concept).
2. **One Thing at a Time:** Focus on one concept or question per response.
3. **Use Markdown:** Use bullet points for lists, **bold** for key terms, and code blocks for code snippets.
4. **Socratic Method:** Ask open-ended questions to stimulate thinking.
5. **Positive & Encouraging:** Maintain a supportive tone.
6. **Listen Actively:** Address the user's specific questions before moving on.
7. **No Long Paragraphs:** Break complex concepts into bullet points or multiple shorter messages.

YOUR TUTORING APPROACH:
1. Provide clear, concise explanations related to this module
2. Ask guiding questions to help the user discover concepts themselves
3. Break down complex topics into manageable pieces
4. Offer positive reinforcement for correct understanding
5. Periodically assess the user's understanding with simple questions{resource_steps}

When the user demonstrates understanding of a concept, briefly acknowledge it and move on.
Example: "**Great job!** You've understood [concept]. Let's move to [next concept]."

If the user asks for videos or resources, recommend specific search terms or point them to the module's resources.

Be encouraging, patient, and adapt to the user's learning pace."#,
                title = module.title,
                description = module.description,
            )
        }
        TutoringMode::General => r#"You are an expert learning companion AI that helps users achieve their learning goals.

Your role is to:
1. Help users define clear learning goals
2. Assess their existing knowledge
3. Provide guidance and explanations
4. Be encouraging and supportive

Be conversational, helpful, and focused on the user's learning journey."#
            .to_string(),
    }
}

fn format_video_reply(topic: &str, videos: &[Resource]) -> String {
    let links = videos
        .iter()
        .enumerate()
        .map(|(i, v)| {
            format!(
                "{}. [{}](https://www.youtube.com/watch?v={}) - {}",
                i + 1,
                v.title,
                v.locator.value(),
                v.ai_justification
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Here are some YouTube videos about {} that might help you:\n\n{}\n\nYou can click on any of these links to watch the videos. Let me know if you have questions about the content!",
        topic, links
    )
}

pub struct TutorService {
    llm: Arc<dyn TextGenerator>,
    resources: Arc<ResourceService>,
}

impl TutorService {
    pub fn new(llm: Arc<dyn TextGenerator>, resources: Arc<ResourceService>) -> Self {
        Self { llm, resources }
    }

    /// One tutoring turn. `video_topic` is the active module title, if any;
    /// a video request for it is answered with links instead of prose.
    pub async fn reply(
        &self,
        mode: &TutoringMode,
        video_topic: Option<&str>,
        history: &[HistoryEntry],
        message: &str,
    ) -> Result<String, LlmError> {
        if let Some(topic) = video_topic.filter(|_| is_video_request(message)) {
            tracing::info!("Video request detected for module '{}'", topic);
            let videos = self
                .resources
                .videos_for_topic(topic, VIDEO_REQUEST_LIMIT)
                .await;
            if !videos.is_empty() {
                return Ok(format_video_reply(topic, &videos));
            }
            tracing::debug!("No videos found for '{}', answering normally", topic);
        }

        self.llm
            .converse(&system_prompt(mode), history, message)
            .await
    }

    /// Stateless exchange: failures become the apology text.
    pub async fn exchange(&self, req: &TutorRequest) -> String {
        let mode = TutoringMode::from_request(req);
        let topic = req.active_module.as_ref().map(|m| m.title.as_str());

        match self.reply(&mode, topic, &req.chat_history, &req.message).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Tutoring exchange failed: {}", e);
                APOLOGY.to_string()
            }
        }
    }
}
