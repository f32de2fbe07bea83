//! Text generation capability.
//!
//! Everything above this module treats the language model as an opaque
//! "prompt in, text out" service. [`GeminiClient`] is the production
//! implementation; tests substitute scripted generators.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::metrics::track_llm_call;
use crate::models::chat::{ChatRole, HistoryEntry};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model credentials are not configured")]
    MissingCredentials,

    #[error("language model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("language model returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("language model returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Single-shot generation for a prompt.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Multi-turn exchange framed by a system instruction.
    async fn converse(
        &self,
        system: &str,
        history: &[HistoryEntry],
        message: &str,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

fn wire_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

pub struct GeminiClient {
    http_client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &Config, http_client: Client) -> Self {
        Self {
            http_client,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn generate_content(
        &self,
        request: &GenerateContentRequest<'_>,
    ) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingCredentials)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", api_key)])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Gemini returned {}: {}", status, body);
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        body.into_text().ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: None,
        };

        track_llm_call("generate", self.generate_content(&request)).await
    }

    async fn converse(
        &self,
        system: &str,
        history: &[HistoryEntry],
        message: &str,
    ) -> Result<String, LlmError> {
        let mut contents: Vec<Content<'_>> = history
            .iter()
            .map(|entry| Content {
                role: wire_role(entry.role),
                parts: vec![Part {
                    text: &entry.content,
                }],
            })
            .collect();
        contents.push(Content {
            role: "user",
            parts: vec![Part { text: message }],
        });

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(SystemInstruction {
                parts: vec![Part { text: system }],
            }),
        };

        track_llm_call("converse", self.generate_content(&request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let client = GeminiClient::new(&Config::default(), Client::new());
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, LlmError::MissingCredentials));
    }

    #[test]
    fn request_uses_system_instruction_and_model_role() {
        let history = [HistoryEntry {
            role: ChatRole::Assistant,
            content: "Hi there".into(),
        }];
        let request = GenerateContentRequest {
            contents: history
                .iter()
                .map(|e| Content {
                    role: wire_role(e.role),
                    parts: vec![Part { text: &e.content }],
                })
                .collect(),
            system_instruction: Some(SystemInstruction {
                parts: vec![Part { text: "be brief" }],
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "model");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
    }

    #[test]
    fn response_text_joins_parts() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.into_text().as_deref(), Some("Hello, world"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.into_text().is_none());
    }
}
