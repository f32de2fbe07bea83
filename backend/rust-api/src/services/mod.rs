use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use tokio::sync::RwLock;

use crate::config::Config;

use self::countdown_service::{
    CountdownService, DeadlineStore, InMemoryDeadlineStore, RedisDeadlineStore,
};
use self::discovery_service::ResourceDiscoveryPipeline;
use self::document_service::DocumentService;
use self::llm_client::{GeminiClient, TextGenerator};
use self::plan_service::PlanSynthesizer;
use self::relevance_service::RelevanceFilter;
use self::resource_service::ResourceService;
use self::study_aids_service::StudyAidsService;
use self::study_state::StudyState;
use self::tutor_service::TutorService;

pub struct AppState {
    pub config: Config,
    pub planner: PlanSynthesizer,
    pub resources: Arc<ResourceService>,
    pub tutor: TutorService,
    pub study_aids: StudyAidsService,
    pub documents: DocumentService,
    pub countdown: CountdownService,
    pub study: RwLock<StudyState>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .build()?;

        let llm: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(&config, http_client.clone()));
        if config.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set, all generated content will use fallbacks");
        }

        let discovery = ResourceDiscoveryPipeline::from_config(&config, http_client);

        let store: Arc<dyn DeadlineStore> = match &config.redis_uri {
            Some(uri) => Arc::new(RedisDeadlineStore::new(connect_redis(uri).await?)),
            None => {
                tracing::info!("REDIS_URI not set, countdown deadline kept in memory");
                Arc::new(InMemoryDeadlineStore::default())
            }
        };

        Ok(Self::from_parts(config, llm, discovery, store))
    }

    /// Assembles the state around an explicit generator, discovery pipeline
    /// and deadline store.
    pub fn from_parts(
        config: Config,
        llm: Arc<dyn TextGenerator>,
        discovery: ResourceDiscoveryPipeline,
        store: Arc<dyn DeadlineStore>,
    ) -> Self {
        let resources = Arc::new(ResourceService::new(
            Arc::new(discovery),
            Arc::new(RelevanceFilter::new(llm.clone())),
        ));

        Self {
            config,
            planner: PlanSynthesizer::new(llm.clone()),
            tutor: TutorService::new(llm.clone(), resources.clone()),
            study_aids: StudyAidsService::new(llm.clone()),
            documents: DocumentService::new(llm),
            resources,
            countdown: CountdownService::new(store),
            study: RwLock::new(StudyState::new()),
        }
    }
}

async fn connect_redis(uri: &str) -> anyhow::Result<ConnectionManager> {
    tracing::info!("Attempting to connect to Redis...");
    let client = redis::Client::open(uri)?;

    let redis = tokio::time::timeout(Duration::from_secs(30), ConnectionManager::new(client))
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

    let mut conn = redis.clone();
    tokio::time::timeout(
        Duration::from_secs(5),
        redis::cmd("PING").query_async::<String>(&mut conn),
    )
    .await
    .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

    tracing::info!("Redis connection established successfully");
    Ok(redis)
}

pub mod countdown_service;
pub mod discovery_service;
pub mod document_service;
pub mod llm_client;
pub mod plan_service;
pub mod progress_service;
pub mod relevance_service;
pub mod resource_service;
pub mod search_providers;
pub mod study_aids_service;
pub mod study_state;
pub mod tutor_service;
