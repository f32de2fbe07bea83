use std::sync::Arc;

use serde_json::Value;

use crate::metrics;
use crate::models::study_aids::{
    PracticeQuestion, PracticeQuestionsRequest, QuizQuestion, ResourceAidRequest,
};
use crate::services::llm_client::TextGenerator;
use crate::utils::json::parse_array;

const OPTIONS_PER_QUESTION: usize = 4;

/// Quiz, summary and practice-question generation. Every call degrades to
/// fixed content instead of failing.
pub struct StudyAidsService {
    llm: Arc<dyn TextGenerator>,
}

impl StudyAidsService {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    pub async fn quiz(&self, req: &ResourceAidRequest) -> Vec<QuizQuestion> {
        let prompt = format!(
            r#"You are an expert educational content creator specializing in creating effective quiz questions.

RESOURCE: {} ({})
MODULE: {}
MODULE DESCRIPTION: {}

Create 3 multiple-choice quiz questions based on the likely content of this resource.
Since you don't have direct access to the resource content, create questions that would likely
test understanding of the core concepts related to the module and resource title.

For each question:
1. Make it clear and specific
2. Provide 4 possible answers (only one should be correct)
3. Ensure the correct answer is not always in the same position

Return your response as a JSON array in the following format:
[
  {{
    "question": "Question text here?",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "correctAnswer": 0
  }}
]

Only return the JSON array, nothing else."#,
            req.resource_title,
            req.resource_type,
            req.module_title,
            non_empty_or(&req.module_description, "N/A"),
        );

        let questions = match self.llm.generate(&prompt).await {
            Ok(text) => parse_items(&text, quiz_item),
            Err(e) => {
                tracing::warn!("Quiz generation failed for '{}': {}", req.resource_title, e);
                Vec::new()
            }
        };

        if questions.is_empty() {
            tracing::warn!("Using fallback quiz for '{}'", req.resource_title);
            metrics::record_fallback("quiz");
            return fallback_quiz(&req.resource_title);
        }
        questions
    }

    pub async fn summary(&self, req: &ResourceAidRequest) -> String {
        let prompt = format!(
            r#"You are an expert educational content summarizer. Your task is to create a concise, informative summary of a resource.

RESOURCE: {} ({})
MODULE: {}

Create a brief summary (3-5 sentences) of what this resource likely covers based on its title and the module context.
Since you don't have direct access to the resource content, focus on what would be the most likely key points and takeaways
from a resource with this title in the context of this learning module.

Your summary should:
1. Be informative and educational
2. Cover the most likely main points
3. Be written in a clear, concise style
4. Avoid speculative language like "might" or "probably" - write as if you're certain of the content

Only return the summary text, nothing else."#,
            req.resource_title, req.resource_type, req.module_title
        );

        match self.llm.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!("Empty summary for '{}'", req.resource_title);
                metrics::record_fallback("summary");
                fallback_summary(req)
            }
            Err(e) => {
                tracing::warn!("Summary generation failed for '{}': {}", req.resource_title, e);
                metrics::record_fallback("summary");
                fallback_summary(req)
            }
        }
    }

    pub async fn practice_questions(&self, req: &PracticeQuestionsRequest) -> Vec<PracticeQuestion> {
        let count = req.clamped_count();
        let prompt = format!(
            r#"Generate {count} practice questions for a last-minute exam preparation on the topic: "{}".

Additional context about this module:
{}

Key concepts covered in this module:
{}

For each question:
1. Create a challenging but fair multiple-choice question that tests understanding, not just memorization
2. Provide 4 answer options (A, B, C, D)
3. Indicate which option is correct (0-based index, where 0 is A, 1 is B, etc.)
4. Include a brief explanation of why the correct answer is right and why others are wrong

Return the questions in the following JSON format:
[
  {{
    "text": "Question text here?",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "correctAnswer": 0,
    "explanation": "Explanation of the correct answer"
  }}
]

The questions should be exam-focused, testing critical knowledge needed to pass an exam on this topic.
Include questions that test different cognitive levels (knowledge, comprehension, application, analysis)."#,
            req.module_title,
            req.module_description,
            non_empty_or(&req.key_concepts_preview, "Not specified"),
        );

        let questions = match self.llm.generate(&prompt).await {
            Ok(text) => parse_items(&text, practice_item),
            Err(e) => {
                tracing::warn!(
                    "Practice question generation failed for module={}: {}",
                    req.module_id,
                    e
                );
                Vec::new()
            }
        };

        if questions.is_empty() {
            tracing::warn!("Using fallback practice questions for module={}", req.module_id);
            metrics::record_fallback("practice_questions");
            return fallback_practice_questions(&req.module_title);
        }

        questions.into_iter().take(count as usize).collect()
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

/// Decodes an array and keeps the items `convert` accepts.
fn parse_items<T>(text: &str, convert: fn(&Value) -> Option<T>) -> Vec<T> {
    match parse_array::<Value>(text) {
        Ok(items) => items.iter().filter_map(convert).collect(),
        Err(e) => {
            tracing::debug!("Generated text is not a JSON array: {}", e);
            Vec::new()
        }
    }
}

fn options_of(item: &Value) -> Option<Vec<String>> {
    let options: Vec<String> = item
        .get("options")?
        .as_array()?
        .iter()
        .map(|o| match o {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    (options.len() == OPTIONS_PER_QUESTION).then_some(options)
}

fn answer_index(item: &Value, keys: &[&str]) -> Option<usize> {
    let index = keys.iter().find_map(|k| item.get(*k)?.as_u64())? as usize;
    (index < OPTIONS_PER_QUESTION).then_some(index)
}

fn text_field(item: &Value, key: &str) -> Option<String> {
    let text = item.get(key)?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn quiz_item(item: &Value) -> Option<QuizQuestion> {
    Some(QuizQuestion {
        question: text_field(item, "question")?,
        options: options_of(item)?,
        correct_answer: answer_index(item, &["correctAnswer", "correctAnswerIndex"])?,
    })
}

fn practice_item(item: &Value) -> Option<PracticeQuestion> {
    Some(PracticeQuestion {
        text: text_field(item, "text").or_else(|| text_field(item, "question"))?,
        options: options_of(item)?,
        correct_answer: answer_index(item, &["correctAnswer", "correctAnswerIndex"])?,
        explanation: text_field(item, "explanation").unwrap_or_default(),
    })
}

fn options(values: [&str; 4]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn fallback_quiz(resource_title: &str) -> Vec<QuizQuestion> {
    vec![
        QuizQuestion {
            question: format!("What is the main topic covered in \"{}\"?", resource_title),
            options: options([
                "The core concepts of the module",
                "An unrelated subject",
                "Only historical background",
                "None of the above",
            ]),
            correct_answer: 0,
        },
        QuizQuestion {
            question: "Which approach best helps you retain what this resource explains?".into(),
            options: options([
                "Skimming it once",
                "Memorizing the title",
                "Explaining the key ideas in your own words",
                "Skipping the examples",
            ]),
            correct_answer: 2,
        },
        QuizQuestion {
            question: "After studying this resource, what should you be able to do?".into(),
            options: options([
                "Recite it word for word",
                "Apply its ideas to exam-style problems",
                "List its author's other work",
                "Nothing in particular",
            ]),
            correct_answer: 1,
        },
    ]
}

pub fn fallback_summary(req: &ResourceAidRequest) -> String {
    format!(
        "This {} covers key concepts related to {}. Review \"{}\" for the main ideas and examples, then test yourself with a quiz.",
        req.resource_type, req.module_title, req.resource_title
    )
}

pub fn fallback_practice_questions(module_title: &str) -> Vec<PracticeQuestion> {
    vec![
        PracticeQuestion {
            text: format!("What is the main focus of \"{}\"?", module_title),
            options: options([
                "Understanding core concepts",
                "Memorizing definitions",
                "Practical applications",
                "Historical context",
            ]),
            correct_answer: 0,
            explanation: "The main focus is understanding core concepts as they form the foundation for more advanced topics.".into(),
        },
        PracticeQuestion {
            text: "Which of the following best describes a key learning outcome from this module?".into(),
            options: options([
                "Ability to recite facts",
                "Critical thinking and problem solving",
                "Memorization of formulas",
                "Speed of calculation",
            ]),
            correct_answer: 1,
            explanation: "Critical thinking and problem solving are essential skills developed in this module.".into(),
        },
        PracticeQuestion {
            text: "In a typical exam question on this topic, what would you be asked to do?".into(),
            options: options([
                "Compare and contrast concepts",
                "List definitions in order",
                "Solve a practical problem",
                "Describe historical development",
            ]),
            correct_answer: 2,
            explanation: "Exam questions typically focus on applying knowledge to solve practical problems.".into(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::HistoryEntry;
    use crate::services::llm_client::LlmError;
    use async_trait::async_trait;

    struct Canned(Option<String>);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            self.0.clone().ok_or(LlmError::EmptyResponse)
        }

        async fn converse(
            &self,
            _system: &str,
            _history: &[HistoryEntry],
            _message: &str,
        ) -> Result<String, LlmError> {
            Err(LlmError::MissingCredentials)
        }
    }

    fn service(reply: Option<&str>) -> StudyAidsService {
        StudyAidsService::new(Arc::new(Canned(reply.map(str::to_string))))
    }

    fn aid_request() -> ResourceAidRequest {
        ResourceAidRequest {
            resource_title: "Dijkstra Explained".into(),
            resource_type: "video".into(),
            module_title: "Shortest Paths".into(),
            module_description: String::new(),
        }
    }

    fn practice_request(count: Option<u32>) -> PracticeQuestionsRequest {
        PracticeQuestionsRequest {
            module_id: "module-1".into(),
            module_title: "Shortest Paths".into(),
            module_description: String::new(),
            key_concepts_preview: String::new(),
            count,
        }
    }

    #[tokio::test]
    async fn invalid_quiz_items_are_dropped() {
        let reply = r#"[
            {"question":"Good?","options":["a","b","c","d"],"correctAnswer":3},
            {"question":"Too few","options":["a","b"],"correctAnswer":0},
            {"question":"Out of range","options":["a","b","c","d"],"correctAnswer":7}
        ]"#;
        let quiz = service(Some(reply)).quiz(&aid_request()).await;
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].question, "Good?");
        assert_eq!(quiz[0].correct_answer, 3);
    }

    #[tokio::test]
    async fn quiz_falls_back_when_nothing_is_valid() {
        let quiz = service(Some("no quiz today")).quiz(&aid_request()).await;
        assert_eq!(quiz.len(), 3);
        assert!(quiz[0].question.contains("Dijkstra Explained"));
        assert!(quiz.iter().all(|q| q.options.len() == 4));

        let quiz = service(None).quiz(&aid_request()).await;
        assert_eq!(quiz.len(), 3);
    }

    #[tokio::test]
    async fn summary_is_trimmed_or_falls_back() {
        let summary = service(Some("  A clear summary.  ")).summary(&aid_request()).await;
        assert_eq!(summary, "A clear summary.");

        let summary = service(Some("   ")).summary(&aid_request()).await;
        assert!(summary.contains("Shortest Paths"));
        assert!(summary.contains("Dijkstra Explained"));
    }

    #[tokio::test]
    async fn practice_questions_respect_count() {
        let item = r#"{"text":"Q","options":["a","b","c","d"],"correctAnswer":1,"explanation":"e"}"#;
        let reply = format!("[{0},{0},{0},{0}]", item);
        let questions = service(Some(&reply))
            .practice_questions(&practice_request(Some(2)))
            .await;
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].explanation, "e");
    }

    #[tokio::test]
    async fn practice_questions_fall_back() {
        let questions = service(None).practice_questions(&practice_request(None)).await;
        assert_eq!(questions.len(), 3);
        assert_eq!(
            questions[0].text,
            "What is the main focus of \"Shortest Paths\"?"
        );
        assert_eq!(questions[2].correct_answer, 2);
    }
}
