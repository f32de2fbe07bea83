use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::models::resource::{ArticleCandidate, VideoCandidate};

const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const GOOGLE_CSE_URL: &str = "https://www.googleapis.com/customsearch/v1";
const BING_SEARCH_URL: &str = "https://api.bing.microsoft.com/v7.0/search";
const SERPER_SEARCH_URL: &str = "https://google.serper.dev/search";

pub const MAX_RESULTS: u32 = 5;
pub const VIDEO_QUERY_SUFFIX: &str = " tutorial education";
pub const ARTICLE_QUERY_SUFFIX: &str = " tutorial guide learn";

/// Stand-in for a keyword the caller did not supply.
pub const KEYWORD_PLACEHOLDER: &str = "this topic";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} credentials are not configured")]
    MissingCredentials(&'static str),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("provider returned no results")]
    Empty,
}

#[async_trait]
pub trait SearchProvider<C: Send>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, keywords: &[String]) -> Result<Vec<C>, ProviderError>;
}

fn query(keywords: &[String], suffix: &str) -> String {
    format!("{}{}", keywords.join(" "), suffix)
}

fn non_empty<C>(items: Vec<C>) -> Result<Vec<C>, ProviderError> {
    if items.is_empty() {
        Err(ProviderError::Empty)
    } else {
        Ok(items)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ProviderError::Status(status.as_u16()))
    }
}

// ---------------------------------------------------------------------------
// YouTube Data API v3

#[derive(Debug, Deserialize)]
struct YouTubeSearchResponse {
    #[serde(default)]
    items: Vec<YouTubeItem>,
}

#[derive(Debug, Deserialize)]
struct YouTubeItem {
    id: YouTubeItemId,
    snippet: YouTubeSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YouTubeItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YouTubeSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
}

pub struct YouTubeProvider {
    http_client: Client,
    api_key: Option<String>,
}

impl YouTubeProvider {
    pub fn new(http_client: Client, api_key: Option<String>) -> Self {
        Self {
            http_client,
            api_key,
        }
    }
}

#[async_trait]
impl SearchProvider<VideoCandidate> for YouTubeProvider {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<VideoCandidate>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials("YouTube"))?;
        let q = query(keywords, VIDEO_QUERY_SUFFIX);
        let max_results = MAX_RESULTS.to_string();

        let response = self
            .http_client
            .get(YOUTUBE_SEARCH_URL)
            .query(&[
                ("part", "snippet"),
                ("maxResults", max_results.as_str()),
                ("q", q.as_str()),
                ("type", "video"),
                ("relevanceLanguage", "en"),
                ("videoDuration", "medium"),
                ("key", api_key),
            ])
            .send()
            .await?;

        let body: YouTubeSearchResponse = ensure_success(response).await?.json().await?;
        let videos = body
            .items
            .into_iter()
            .filter_map(|item| {
                Some(VideoCandidate {
                    video_id: item.id.video_id?,
                    title: item.snippet.title,
                    description: item.snippet.description,
                    channel_title: item.snippet.channel_title,
                })
            })
            .collect();

        non_empty(videos)
    }
}

// ---------------------------------------------------------------------------
// Web article providers

#[derive(Debug, Deserialize)]
struct LinkItem {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

impl From<LinkItem> for ArticleCandidate {
    fn from(item: LinkItem) -> Self {
        ArticleCandidate {
            url: item.link,
            title: item.title,
            snippet: item.snippet,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleCseResponse {
    #[serde(default)]
    items: Vec<LinkItem>,
}

pub struct GoogleCseProvider {
    http_client: Client,
    credentials: Option<(String, String)>,
}

impl GoogleCseProvider {
    /// Needs both the API key and the search engine id.
    pub fn new(http_client: Client, api_key: Option<String>, engine_id: Option<String>) -> Self {
        Self {
            http_client,
            credentials: api_key.zip(engine_id),
        }
    }
}

#[async_trait]
impl SearchProvider<ArticleCandidate> for GoogleCseProvider {
    fn name(&self) -> &'static str {
        "google_cse"
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<ArticleCandidate>, ProviderError> {
        let (api_key, engine_id) = self
            .credentials
            .as_ref()
            .ok_or(ProviderError::MissingCredentials("Google Custom Search"))?;
        let q = query(keywords, ARTICLE_QUERY_SUFFIX);
        let num = MAX_RESULTS.to_string();

        let response = self
            .http_client
            .get(GOOGLE_CSE_URL)
            .query(&[
                ("key", api_key.as_str()),
                ("cx", engine_id.as_str()),
                ("q", q.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        let body: GoogleCseResponse = ensure_success(response).await?.json().await?;
        non_empty(body.items.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingResponse {
    web_pages: Option<BingWebPages>,
}

#[derive(Debug, Deserialize)]
struct BingWebPages {
    #[serde(default)]
    value: Vec<BingItem>,
}

#[derive(Debug, Deserialize)]
struct BingItem {
    #[serde(default)]
    name: String,
    url: String,
    #[serde(default)]
    snippet: String,
}

pub struct BingProvider {
    http_client: Client,
    api_key: Option<String>,
}

impl BingProvider {
    pub fn new(http_client: Client, api_key: Option<String>) -> Self {
        Self {
            http_client,
            api_key,
        }
    }
}

#[async_trait]
impl SearchProvider<ArticleCandidate> for BingProvider {
    fn name(&self) -> &'static str {
        "bing"
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<ArticleCandidate>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials("Bing"))?;
        let q = query(keywords, ARTICLE_QUERY_SUFFIX);
        let count = MAX_RESULTS.to_string();

        let response = self
            .http_client
            .get(BING_SEARCH_URL)
            .header("Ocp-Apim-Subscription-Key", api_key)
            .query(&[
                ("q", q.as_str()),
                ("count", count.as_str()),
                ("responseFilter", "Webpages"),
            ])
            .send()
            .await?;

        let body: BingResponse = ensure_success(response).await?.json().await?;
        let articles = body
            .web_pages
            .map(|pages| pages.value)
            .unwrap_or_default()
            .into_iter()
            .map(|item| ArticleCandidate {
                url: item.url,
                title: item.name,
                snippet: item.snippet,
            })
            .collect();

        non_empty(articles)
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<LinkItem>,
}

pub struct SerperProvider {
    http_client: Client,
    api_key: Option<String>,
}

impl SerperProvider {
    pub fn new(http_client: Client, api_key: Option<String>) -> Self {
        Self {
            http_client,
            api_key,
        }
    }
}

#[async_trait]
impl SearchProvider<ArticleCandidate> for SerperProvider {
    fn name(&self) -> &'static str {
        "serper"
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<ArticleCandidate>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials("Serper"))?;

        let response = self
            .http_client
            .post(SERPER_SEARCH_URL)
            .header("X-API-KEY", api_key)
            .json(&serde_json::json!({
                "q": query(keywords, ARTICLE_QUERY_SUFFIX),
                "num": MAX_RESULTS,
            }))
            .send()
            .await?;

        let body: SerperResponse = ensure_success(response).await?.json().await?;
        non_empty(body.organic.into_iter().map(Into::into).collect())
    }
}

// ---------------------------------------------------------------------------
// Synthetic candidates

/// First three keywords, padded with the placeholder when fewer are given.
fn first_three(keywords: &[String]) -> [&str; 3] {
    let at = |i: usize| {
        keywords
            .get(i)
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .unwrap_or(KEYWORD_PLACEHOLDER)
    };
    [at(0), at(1), at(2)]
}

pub fn synthetic_videos(keywords: &[String]) -> Vec<VideoCandidate> {
    let [k0, k1, k2] = first_three(keywords);
    let joined = if keywords.is_empty() {
        KEYWORD_PLACEHOLDER.to_string()
    } else {
        keywords.join(", ")
    };

    vec![
        VideoCandidate {
            video_id: "dQw4w9WgXcQ".to_string(),
            title: format!("Learn about {} - Educational Video", k0),
            description: format!("This video covers {} and related concepts in detail.", joined),
            channel_title: "Educational Channel".to_string(),
        },
        VideoCandidate {
            video_id: "xvFZjo5PgG0".to_string(),
            title: format!("{} Tutorial for Beginners", k1),
            description: format!("A comprehensive tutorial on {} for beginners.", k1),
            channel_title: "Tutorial Channel".to_string(),
        },
        VideoCandidate {
            video_id: "jNQXAC9IVRw".to_string(),
            title: format!("Advanced {} Techniques", k2),
            description: format!("This video explores advanced techniques in {}.", k2),
            channel_title: "Advanced Learning".to_string(),
        },
    ]
}

pub fn synthetic_articles(keywords: &[String]) -> Vec<ArticleCandidate> {
    let [k0, k1, k2] = first_three(keywords);

    vec![
        ArticleCandidate {
            url: "https://example.com/article1".to_string(),
            title: format!("Understanding {}: A Comprehensive Guide", k0),
            snippet: format!(
                "This article provides a comprehensive guide to {} and its applications.",
                k0
            ),
        },
        ArticleCandidate {
            url: "https://example.com/article2".to_string(),
            title: format!("{}: From Basics to Advanced Concepts", k1),
            snippet: format!(
                "Learn about {} from the basics to advanced concepts in this detailed article.",
                k1
            ),
        },
        ArticleCandidate {
            url: "https://example.com/article3".to_string(),
            title: format!("Practical Applications of {}", k2),
            snippet: format!("Discover the practical applications of {} in various fields.", k2),
        },
    ]
}
