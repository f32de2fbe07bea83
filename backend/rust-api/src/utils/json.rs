//! Lenient extraction of JSON payloads from model output.
//!
//! Generated text frequently wraps the payload in markdown fences or
//! surrounds it with prose. Callers pick the extraction order that suits the
//! payload they expect and then decode into a strict schema.

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;

lazy_static! {
    static ref FENCED_JSON_RE: Regex = Regex::new(r"(?s)```json\s*\n(.*?)\n\s*```").unwrap();
    static ref FENCED_RE: Regex = Regex::new(r"(?s)```\s*\n(.*?)\n\s*```").unwrap();
}

/// Body of a ```json fence, then of a bare ``` fence.
pub fn extract_fenced(text: &str) -> Option<&str> {
    FENCED_JSON_RE
        .captures(text)
        .or_else(|| FENCED_RE.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Substring starting at the first `open` and ending at its matching
/// `close`, ignoring brackets inside string literals. When the brackets never
/// balance, the last `close` in the text ends the span.
pub fn extract_delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..end + close.len_utf8()])
}

/// Decodes a JSON object: fenced body, then the whole text, then the first
/// balanced `{...}` span.
pub fn parse_object<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    if let Some(body) = extract_fenced(text) {
        if let Ok(value) = serde_json::from_str(body.trim()) {
            return Ok(value);
        }
    }

    match serde_json::from_str(text.trim()) {
        Ok(value) => Ok(value),
        Err(err) => match extract_delimited(text, '{', '}') {
            Some(span) => serde_json::from_str(span),
            None => Err(err),
        },
    }
}

/// Decodes a JSON array: the first balanced `[...]` span, falling back to the
/// whole text when no array is present.
pub fn parse_array<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, serde_json::Error> {
    match extract_delimited(text, '[', ']') {
        Some(span) => serde_json::from_str(span),
        None => serde_json::from_str(text.trim()),
    }
}
