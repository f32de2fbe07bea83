use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    #[serde(alias = "youtube")]
    Video,
    Article,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Video => "video",
            ResourceKind::Article => "article",
        }
    }

    pub fn noun(&self) -> &'static str {
        match self {
            ResourceKind::Video => "video",
            ResourceKind::Article => "article",
        }
    }

    pub fn consumed_label(&self, consumed: bool) -> &'static str {
        match (self, consumed) {
            (ResourceKind::Video, true) => "Watched",
            (ResourceKind::Video, false) => "Not watched yet",
            (ResourceKind::Article, true) => "Read",
            (ResourceKind::Article, false) => "Not read yet",
        }
    }
}

/// Where a resource lives: a video id or an article URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Locator {
    #[serde(alias = "youtube")]
    Video {
        #[serde(rename = "videoId")]
        video_id: String,
    },
    Article { url: String },
}

impl Locator {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Locator::Video { .. } => ResourceKind::Video,
            Locator::Article { .. } => ResourceKind::Article,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Video { video_id } => video_id,
            Locator::Article { url } => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(alias = "correctAnswerIndex")]
    pub correct_answer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    #[serde(flatten)]
    pub locator: Locator,
    pub title: String,
    pub ai_justification: String,
    /// Watched (video) or read (article).
    #[serde(default)]
    pub consumed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_questions: Option<Vec<QuizQuestion>>,
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        self.locator.kind()
    }
}

/// Unranked video returned by a discovery provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCandidate {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
}

/// Unranked article returned by a discovery provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleCandidate {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Common view over candidates of either class.
pub trait Candidate: Serialize + Send + Sync {
    const KIND: ResourceKind;

    fn locator(&self) -> &str;
    fn title(&self) -> &str;
}

impl Candidate for VideoCandidate {
    const KIND: ResourceKind = ResourceKind::Video;

    fn locator(&self) -> &str {
        &self.video_id
    }

    fn title(&self) -> &str {
        &self.title
    }
}

impl Candidate for ArticleCandidate {
    const KIND: ResourceKind = ResourceKind::Article;

    fn locator(&self) -> &str {
        &self.url
    }

    fn title(&self) -> &str {
        &self.title
    }
}

/// Candidate chosen by the relevance filter.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub kind: ResourceKind,
    pub locator: String,
    pub title: String,
    pub justification: String,
}

impl RankedCandidate {
    pub fn into_locator(self) -> Locator {
        match self.kind {
            ResourceKind::Video => Locator::Video {
                video_id: self.locator,
            },
            ResourceKind::Article => Locator::Article { url: self.locator },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResourcesRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "moduleId is required"))]
    pub module_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "moduleTitle is required"))]
    pub module_title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "moduleDescription is required"))]
    pub module_description: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "searchKeywords must not be empty"))]
    pub search_keywords: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DiscoverResourcesResponse {
    pub resources: Vec<Resource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_serializes_flat_locator() {
        let resource = Resource {
            id: "video-m1-1".into(),
            locator: Locator::Video {
                video_id: "abc123".into(),
            },
            title: "Intro".into(),
            ai_justification: "Relevant".into(),
            consumed: false,
            summary: None,
            quiz_questions: None,
        };

        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["videoId"], "abc123");
        assert_eq!(json["aiJustification"], "Relevant");
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn legacy_youtube_type_is_accepted() {
        let json = r#"{"id":"r1","type":"youtube","videoId":"v","title":"t","aiJustification":"j"}"#;
        let resource: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.kind(), ResourceKind::Video);
        assert!(!resource.consumed);
    }
}
