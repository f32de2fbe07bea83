use std::path::Path;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use thiserror::Error;

use crate::metrics;
use crate::models::document::{MAX_DOCUMENT_BYTES, PREVIEW_CHARS};
use crate::services::llm_client::TextGenerator;
use crate::utils::json::parse_object;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Document exceeds the {} byte limit", MAX_DOCUMENT_BYTES)]
    TooLarge,

    #[error("Invalid document encoding: {0}")]
    InvalidEncoding(String),
}

#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub file_name: String,
    pub file_size: usize,
    pub text: String,
    pub processed_content: Value,
}

impl ProcessedDocument {
    pub fn preview(&self) -> String {
        preview(&self.text)
    }
}

pub fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Text extraction for uploaded study material. Only plain text is actually
/// read; office and PDF formats get a placeholder.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, DocumentError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "txt" => String::from_utf8(bytes.to_vec())
            .map_err(|e| DocumentError::InvalidEncoding(e.to_string())),
        "pdf" | "doc" | "docx" => Ok(format!(
            "[Extracted content from .{} file: {}]\n\n\
             Text extraction for this format is not available; the document was accepted \
             and can be studied through its title and your own notes.",
            extension, file_name
        )),
        "" => Err(DocumentError::UnsupportedType(file_name.to_string())),
        other => Err(DocumentError::UnsupportedType(format!(".{}", other))),
    }
}

pub struct DocumentService {
    llm: Arc<dyn TextGenerator>,
}

impl DocumentService {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    pub async fn process(
        &self,
        file_name: &str,
        content_base64: &str,
    ) -> Result<ProcessedDocument, DocumentError> {
        let bytes = general_purpose::STANDARD
            .decode(content_base64.trim())
            .map_err(|e| DocumentError::InvalidEncoding(e.to_string()))?;

        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(DocumentError::TooLarge);
        }

        let text = extract_text(file_name, &bytes)?;
        tracing::info!(
            "Document received: file={}, bytes={}, chars={}",
            file_name,
            bytes.len(),
            text.chars().count()
        );

        let processed_content = self.analyse(&text).await;

        Ok(ProcessedDocument {
            file_name: file_name.to_string(),
            file_size: bytes.len(),
            text,
            processed_content,
        })
    }

    /// Structured outline of the document, or `{rawContent}` when the model
    /// does not return JSON.
    async fn analyse(&self, text: &str) -> Value {
        let prompt = format!(
            r#"You are an AI assistant helping to extract key information from a syllabus or job description.
Please analyze the following document and extract:

1. Main topics/requirements (as a list)
2. Key concepts that need to be understood
3. Important dates or deadlines (if any)
4. Prerequisites or assumed knowledge
5. Recommended resources or references

Format the response as a structured JSON object with these fields.

Document content:
{}"#,
            text
        );

        match self.llm.generate(&prompt).await {
            Ok(response) => parse_object::<Value>(&response).unwrap_or_else(|e| {
                tracing::warn!("Document analysis was not JSON: {}", e);
                json!({ "rawContent": response })
            }),
            Err(e) => {
                tracing::warn!("Document analysis failed: {}", e);
                metrics::record_fallback("document_analysis");
                json!({ "rawContent": "" })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::HistoryEntry;
    use crate::services::llm_client::LlmError;
    use async_trait::async_trait;

    struct Analyst(Option<&'static str>);

    #[async_trait]
    impl TextGenerator for Analyst {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            self.0.map(str::to_string).ok_or(LlmError::EmptyResponse)
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

    fn encode(text: &str) -> String {
        general_purpose::STANDARD.encode(text)
    }

    #[test]
    fn extension_decides_extraction() {
        assert_eq!(extract_text("notes.TXT", b"hello").unwrap(), "hello");
        assert!(extract_text("syllabus.pdf", b"%PDF")
            .unwrap()
            .starts_with("[Extracted content from .pdf file: syllabus.pdf]"));
        assert!(matches!(
            extract_text("virus.exe", b"MZ"),
            Err(DocumentError::UnsupportedType(ext)) if ext == ".exe"
        ));
        assert!(matches!(
            extract_text("bad.txt", &[0xff, 0xfe]),
            Err(DocumentError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn preview_is_truncated_with_ellipsis() {
        let long = "a".repeat(PREVIEW_CHARS + 10);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn analysis_parses_fenced_json() {
        let service = DocumentService::new(Arc::new(Analyst(Some(
            "```json\n{\"topics\": [\"Graphs\"]}\n```",
        ))));
        let doc = service.process("s.txt", &encode("Graphs")).await.unwrap();
        assert_eq!(doc.processed_content["topics"][0], "Graphs");
        assert_eq!(doc.file_size, 6);
    }

    #[tokio::test]
    async fn analysis_falls_back_to_raw_content() {
        let prose = DocumentService::new(Arc::new(Analyst(Some("Just prose"))));
        let doc = prose.process("s.txt", &encode("x")).await.unwrap();
        assert_eq!(doc.processed_content, json!({ "rawContent": "Just prose" }));

        let failing = DocumentService::new(Arc::new(Analyst(None)));
        let doc = failing.process("s.txt", &encode("x")).await.unwrap();
        assert_eq!(doc.processed_content, json!({ "rawContent": "" }));
    }

    #[tokio::test]
    async fn oversized_document_is_rejected() {
        let service = DocumentService::new(Arc::new(Analyst(None)));
        let content = general_purpose::STANDARD.encode(vec![b'a'; MAX_DOCUMENT_BYTES + 1]);
        assert!(matches!(
            service.process("big.txt", &content).await,
            Err(DocumentError::TooLarge)
        ));
    }

    #[tokio::test]
    async fn invalid_base64_is_rejected() {
        let service = DocumentService::new(Arc::new(Analyst(None)));
        assert!(matches!(
            service.process("s.txt", "***").await,
            Err(DocumentError::InvalidEncoding(_))
        ));
    }
}
