use std::sync::Arc;

use reqwest::Client;

use crate::config::Config;
use crate::metrics;
use crate::models::resource::{ArticleCandidate, Candidate, VideoCandidate};
use crate::services::search_providers::{
    synthetic_articles, synthetic_videos, BingProvider, GoogleCseProvider, SearchProvider,
    SerperProvider, YouTubeProvider,
};

/// Ordered providers for one resource class, ending in a synthetic builder.
///
/// Each provider gets exactly one attempt. A provider that is not
/// configured, fails, or returns nothing hands over to the next one; the
/// synthetic builder always produces candidates.
pub struct ProviderChain<C: Candidate> {
    providers: Vec<Arc<dyn SearchProvider<C>>>,
    synthetic: fn(&[String]) -> Vec<C>,
}

impl<C: Candidate> ProviderChain<C> {
    pub fn new(providers: Vec<Arc<dyn SearchProvider<C>>>, synthetic: fn(&[String]) -> Vec<C>) -> Self {
        Self {
            providers,
            synthetic,
        }
    }

    pub async fn run(&self, keywords: &[String]) -> Vec<C> {
        let class = C::KIND.as_str();

        for provider in &self.providers {
            match provider.search(keywords).await {
                Ok(candidates) => {
                    tracing::debug!(
                        "{} provider {} returned {} candidates",
                        class,
                        provider.name(),
                        candidates.len()
                    );
                    metrics::record_provider_attempt(class, provider.name(), "success");
                    return candidates;
                }
                Err(e) => {
                    tracing::warn!("{} provider {} failed: {}", class, provider.name(), e);
                    metrics::record_provider_attempt(class, provider.name(), "error");
                }
            }
        }

        tracing::warn!("All {} providers failed, using synthetic candidates", class);
        metrics::record_fallback(&format!("{}_discovery", class));
        (self.synthetic)(keywords)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredCandidates {
    pub videos: Vec<VideoCandidate>,
    pub articles: Vec<ArticleCandidate>,
}

pub struct ResourceDiscoveryPipeline {
    videos: ProviderChain<VideoCandidate>,
    articles: ProviderChain<ArticleCandidate>,
}

impl ResourceDiscoveryPipeline {
    pub fn new(
        videos: ProviderChain<VideoCandidate>,
        articles: ProviderChain<ArticleCandidate>,
    ) -> Self {
        Self { videos, articles }
    }

    /// YouTube for videos; Google CSE, Bing, then Serper for articles.
    pub fn from_config(config: &Config, http_client: Client) -> Self {
        let youtube: Arc<dyn SearchProvider<VideoCandidate>> = Arc::new(YouTubeProvider::new(
            http_client.clone(),
            config.youtube_api_key.clone(),
        ));

        let article_providers: Vec<Arc<dyn SearchProvider<ArticleCandidate>>> = vec![
            Arc::new(GoogleCseProvider::new(
                http_client.clone(),
                config.google_search_api_key.clone(),
                config.google_search_engine_id.clone(),
            )),
            Arc::new(BingProvider::new(
                http_client.clone(),
                config.bing_search_api_key.clone(),
            )),
            Arc::new(SerperProvider::new(
                http_client,
                config.serper_api_key.clone(),
            )),
        ];

        Self::new(
            ProviderChain::new(vec![youtube], synthetic_videos),
            ProviderChain::new(article_providers, synthetic_articles),
        )
    }

    /// Pipeline with no live providers.
    pub fn offline() -> Self {
        Self::new(
            ProviderChain::new(Vec::new(), synthetic_videos),
            ProviderChain::new(Vec::new(), synthetic_articles),
        )
    }

    pub async fn videos(&self, keywords: &[String]) -> Vec<VideoCandidate> {
        self.videos.run(keywords).await
    }

    /// Both classes are searched concurrently and independently.
    pub async fn discover(&self, keywords: &[String]) -> DiscoveredCandidates {
        let (videos, articles) =
            futures::future::join(self.videos.run(keywords), self.articles.run(keywords)).await;

        tracing::info!(
            "Discovered {} video and {} article candidates",
            videos.len(),
            articles.len()
        );

        DiscoveredCandidates { videos, articles }
    }
}
