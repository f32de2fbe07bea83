use std::sync::Arc;

use chrono::Utc;

use crate::metrics;
use crate::models::chat::random_base36;
use crate::models::resource::{Locator, RankedCandidate, Resource, ResourceKind};
use crate::services::discovery_service::ResourceDiscoveryPipeline;
use crate::services::relevance_service::RelevanceFilter;

/// Discovery followed by relevance filtering, producing session resources.
pub struct ResourceService {
    discovery: Arc<ResourceDiscoveryPipeline>,
    relevance: Arc<RelevanceFilter>,
}

#[derive(Debug, Clone)]
pub struct ModuleQuery<'a> {
    pub module_id: &'a str,
    pub module_title: &'a str,
    pub module_description: &'a str,
    pub keywords: &'a [String],
}

impl ResourceService {
    pub fn new(discovery: Arc<ResourceDiscoveryPipeline>, relevance: Arc<RelevanceFilter>) -> Self {
        Self {
            discovery,
            relevance,
        }
    }

    /// Videos first, then articles. Never empty.
    pub async fn resources_for_module(&self, query: &ModuleQuery<'_>) -> Vec<Resource> {
        tracing::info!(
            "Fetching resources: module={}, keywords={:?}",
            query.module_id,
            query.keywords
        );

        let found = self.discovery.discover(query.keywords).await;

        let (videos, articles) = futures::future::join(
            self.relevance
                .select(&found.videos, query.module_title, query.module_description),
            self.relevance
                .select(&found.articles, query.module_title, query.module_description),
        )
        .await;

        let resources: Vec<Resource> = videos
            .into_iter()
            .chain(articles)
            .map(|ranked| into_resource(query.module_id, ranked))
            .collect();

        if resources.is_empty() {
            tracing::warn!(
                "No resources survived filtering for module={}, returning placeholders",
                query.module_id
            );
            metrics::record_fallback("mock_resources");
            return mock_resources(query.module_id, query.module_title);
        }

        resources
    }

    /// Up to `limit` videos for the title, used by chat video requests.
    pub async fn videos_for_topic(&self, topic: &str, limit: usize) -> Vec<Resource> {
        let keywords = vec![
            topic.to_string(),
            format!("{} tutorial", topic),
            format!("learn {}", topic),
            format!("{} for beginners", topic),
        ];
        let description = format!("Learning about {}", topic);

        let candidates = self.discovery.videos(&keywords).await;
        self.relevance
            .select(&candidates, topic, &description)
            .await
            .into_iter()
            .take(limit)
            .map(|ranked| into_resource("video-request", ranked))
            .collect()
    }
}

fn resource_id(kind: ResourceKind, module_id: &str) -> String {
    format!(
        "{}-{}-{}-{}",
        kind.as_str(),
        module_id,
        Utc::now().timestamp_millis(),
        random_base36(5)
    )
}

fn into_resource(module_id: &str, ranked: RankedCandidate) -> Resource {
    let id = resource_id(ranked.kind, module_id);
    let title = ranked.title.clone();
    let ai_justification = ranked.justification.clone();

    Resource {
        id,
        locator: ranked.into_locator(),
        title,
        ai_justification,
        consumed: false,
        summary: None,
        quiz_questions: None,
    }
}

fn mock_resources(module_id: &str, module_title: &str) -> Vec<Resource> {
    let millis = Utc::now().timestamp_millis();
    vec![
        Resource {
            id: format!("video-{}-{}-mock1", module_id, millis),
            locator: Locator::Video {
                video_id: "dQw4w9WgXcQ".to_string(),
            },
            title: format!("Introduction to {}", module_title),
            ai_justification: "This is a mock video resource since no real resources were found."
                .to_string(),
            consumed: false,
            summary: None,
            quiz_questions: None,
        },
        Resource {
            id: format!("article-{}-{}-mock1", module_id, millis),
            locator: Locator::Article {
                url: "https://example.com/article".to_string(),
            },
            title: format!("Getting Started with {}", module_title),
            ai_justification:
                "This is a mock article resource since no real resources were found.".to_string(),
            consumed: false,
            summary: None,
            quiz_questions: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::HistoryEntry;
    use crate::services::llm_client::{LlmError, TextGenerator};
    use async_trait::async_trait;

    struct Reply(&'static str);

    #[async_trait]
    impl TextGenerator for Reply {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }

        async fn converse(
            &self,
            _system: &str,
            _history: &[HistoryEntry],
            _message: &str,
        ) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    fn service(reply: &'static str) -> ResourceService {
        ResourceService::new(
            Arc::new(ResourceDiscoveryPipeline::offline()),
            Arc::new(RelevanceFilter::new(Arc::new(Reply(reply)))),
        )
    }

    fn query<'a>(keywords: &'a [String]) -> ModuleQuery<'a> {
        ModuleQuery {
            module_id: "module-1",
            module_title: "Graph Theory",
            module_description: "Basics of graphs",
            keywords,
        }
    }

    #[tokio::test]
    async fn returns_two_videos_then_two_articles_on_fallback() {
        let keywords = vec!["graphs".to_string()];
        let resources = service("not json").resources_for_module(&query(&keywords)).await;

        assert_eq!(resources.len(), 4);
        assert_eq!(resources[0].kind(), ResourceKind::Video);
        assert_eq!(resources[1].kind(), ResourceKind::Video);
        assert_eq!(resources[2].kind(), ResourceKind::Article);
        assert!(resources[0].id.starts_with("video-module-1-"));
        assert!(resources[2].id.starts_with("article-module-1-"));
        assert!(resources.iter().all(|r| !r.consumed));
    }

    #[tokio::test]
    async fn empty_selection_yields_mock_resources() {
        let keywords = vec!["graphs".to_string()];
        let resources = service("[]").resources_for_module(&query(&keywords)).await;

        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].title, "Introduction to Graph Theory");
        assert_eq!(resources[1].title, "Getting Started with Graph Theory");
    }

    #[tokio::test]
    async fn resource_ids_are_unique() {
        let keywords = vec!["graphs".to_string()];
        let resources = service("nope").resources_for_module(&query(&keywords)).await;
        let mut ids: Vec<_> = resources.iter().map(|r| r.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), resources.len());
    }

    #[tokio::test]
    async fn topic_videos_are_limited() {
        let videos = service("garbage").videos_for_topic("Sorting", 3).await;
        assert!(!videos.is_empty() && videos.len() <= 3);
        assert!(videos.iter().all(|v| v.kind() == ResourceKind::Video));
    }
}
