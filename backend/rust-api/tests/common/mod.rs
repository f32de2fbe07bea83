#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use studyplan_api::{
    config::Config,
    create_router,
    models::chat::HistoryEntry,
    services::{
        countdown_service::InMemoryDeadlineStore,
        discovery_service::ResourceDiscoveryPipeline,
        llm_client::{LlmError, TextGenerator},
        AppState,
    },
};

/// Answers a prompt with the reply of the first route whose marker it
/// contains. Unrouted prompts fail like a model without credentials.
#[derive(Default, Clone)]
pub struct RoutedGenerator {
    routes: Vec<(&'static str, String)>,
    chat: Option<String>,
}

impl RoutedGenerator {
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn route(mut self, marker: &'static str, reply: impl Into<String>) -> Self {
        self.routes.push((marker, reply.into()));
        self
    }

    pub fn chat(mut self, reply: impl Into<String>) -> Self {
        self.chat = Some(reply.into());
        self
    }
}

#[async_trait]
impl TextGenerator for RoutedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.routes
            .iter()
            .find(|(marker, _)| prompt.contains(marker))
            .map(|(_, reply)| reply.clone())
            .ok_or(LlmError::MissingCredentials)
    }

    async fn converse(
        &self,
        _system: &str,
        history: &[HistoryEntry],
        message: &str,
    ) -> Result<String, LlmError> {
        match &self.chat {
            Some(prefix) => Ok(format!("{} ({} earlier): {}", prefix, history.len(), message)),
            None => Err(LlmError::MissingCredentials),
        }
    }
}

pub const PLAN_MARKER: &str = "EXAM/INTERVIEW GOAL";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn create_app_with(llm: RoutedGenerator, config: Config) -> Router {
    init_tracing();

    let state = AppState::from_parts(
        config,
        Arc::new(llm),
        ResourceDiscoveryPipeline::offline(),
        Arc::new(InMemoryDeadlineStore::default()),
    );
    create_router(Arc::new(state))
}

pub fn create_test_app(llm: RoutedGenerator) -> Router {
    create_app_with(llm, Config::default())
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    with_json(app, "POST", uri, body).await
}

pub async fn put_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    with_json(app, "PUT", uri, body).await
}

pub async fn post_empty(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

async fn with_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

/// Creates a session plan and returns the module ids in plan order.
pub async fn start_session(app: &Router, goal: &str) -> Vec<String> {
    let (status, body) = post_json(
        app,
        "/api/v1/session/plan",
        serde_json::json!({ "goal": goal, "timeConstraint": "48 hours" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body {}", body);

    body["learningPlan"]["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect()
}
