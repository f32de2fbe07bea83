use std::sync::Arc;

use serde::Deserialize;

use crate::metrics;
use crate::models::resource::{Candidate, RankedCandidate, ResourceKind};
use crate::services::llm_client::TextGenerator;
use crate::utils::json::parse_array;

pub const MAX_SELECTED: usize = 2;

/// Selection returned by the model. Only the locator for the candidate's
/// class is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pick {
    video_id: Option<String>,
    url: Option<String>,
    title: Option<String>,
    ai_justification: Option<String>,
}

impl Pick {
    fn locator(&self, kind: ResourceKind) -> Option<&str> {
        let value = match kind {
            ResourceKind::Video => self.video_id.as_deref(),
            ResourceKind::Article => self.url.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

pub fn generic_justification(kind: ResourceKind) -> String {
    format!(
        "This {} appears to be relevant to your learning module.",
        kind.noun()
    )
}

pub struct RelevanceFilter {
    llm: Arc<dyn TextGenerator>,
}

impl RelevanceFilter {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Picks at most two candidates for the module. Generation or parse
    /// failures degrade to the first two candidates.
    pub async fn select<C: Candidate>(
        &self,
        candidates: &[C],
        module_title: &str,
        module_description: &str,
    ) -> Vec<RankedCandidate> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let kind = C::KIND;
        let prompt = match build_prompt(candidates, module_title, module_description) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!("Failed to serialize {} candidates: {}", kind.as_str(), e);
                return first_available(candidates);
            }
        };

        let text = match self.llm.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Relevance ranking for {} failed: {}", kind.as_str(), e);
                return first_available(candidates);
            }
        };

        match parse_picks(&text, candidates) {
            Some(ranked) => {
                tracing::debug!("Model selected {} {} resources", ranked.len(), kind.as_str());
                ranked
            }
            None => {
                tracing::warn!(
                    "Unusable relevance response for {}, using first candidates",
                    kind.as_str()
                );
                first_available(candidates)
            }
        }
    }
}

fn build_prompt<C: Candidate>(
    candidates: &[C],
    module_title: &str,
    module_description: &str,
) -> Result<String, serde_json::Error> {
    let serialized = serde_json::to_string(candidates)?;
    let (plural, locator_field) = match C::KIND {
        ResourceKind::Video => ("YouTube videos", r#""videoId": "video_id","#),
        ResourceKind::Article => ("web articles", r#""url": "article_url","#),
    };

    Ok(format!(
        r#"You are an expert educational content curator. Your task is to evaluate and select the most relevant and high-quality {plural} for a specific learning module.

MODULE TITLE: {module_title}
MODULE DESCRIPTION: {module_description}

Here are the available resources to evaluate:
{serialized}

For each resource, determine how relevant it is to the module topic, how well it would help a learner understand the module concepts, and why it would be valuable to include.

Select the {MAX_SELECTED} most appropriate resources and return them in the following JSON format:
[
  {{
    {locator_field}
    "title": "Resource title",
    "aiJustification": "Your justification for including this resource"
  }}
]

Only return the JSON array, nothing else."#
    ))
}

/// `None` when the text holds no usable selection. A valid empty array is a
/// deliberate "nothing fits" and stays empty.
fn parse_picks<C: Candidate>(text: &str, candidates: &[C]) -> Option<Vec<RankedCandidate>> {
    let picks: Vec<Pick> = parse_array(text).ok()?;
    if picks.is_empty() {
        return Some(Vec::new());
    }

    let kind = C::KIND;
    let ranked: Vec<RankedCandidate> = picks
        .iter()
        .filter_map(|pick| {
            let locator = pick.locator(kind)?;
            let title = pick
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .or_else(|| {
                    candidates
                        .iter()
                        .find(|c| c.locator() == locator)
                        .map(|c| c.title().to_string())
                })
                .unwrap_or_else(|| locator.to_string());
            let justification = pick
                .ai_justification
                .as_deref()
                .map(str::trim)
                .filter(|j| !j.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| generic_justification(kind));

            Some(RankedCandidate {
                kind,
                locator: locator.to_string(),
                title,
                justification,
            })
        })
        .take(MAX_SELECTED)
        .collect();

    (!ranked.is_empty()).then_some(ranked)
}

fn first_available<C: Candidate>(candidates: &[C]) -> Vec<RankedCandidate> {
    metrics::record_fallback(&format!("{}_relevance", C::KIND.as_str()));
    candidates
        .iter()
        .take(MAX_SELECTED)
        .map(|c| RankedCandidate {
            kind: C::KIND,
            locator: c.locator().to_string(),
            title: c.title().to_string(),
            justification: generic_justification(C::KIND),
        })
        .collect()
}
