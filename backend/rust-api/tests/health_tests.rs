use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};

mod common;

use common::{create_app_with, create_test_app, get, send, RoutedGenerator};
use studyplan_api::config::Config;

#[tokio::test]
async fn test_health_reports_degraded_without_credentials() {
    let app = create_test_app(RoutedGenerator::offline());

    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["service"], "studyplan-api");
    assert_eq!(body["dependencies"]["gemini"]["status"], "fallback");
    assert_eq!(body["dependencies"]["deadline_store"]["status"], "memory");
}

#[tokio::test]
async fn test_health_reports_configured_providers() {
    let config = Config {
        gemini_api_key: Some("key".into()),
        serper_api_key: Some("serper".into()),
        ..Config::default()
    };
    let app = create_app_with(RoutedGenerator::offline(), config);

    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["dependencies"]["article_search"]["status"], "configured");
    assert_eq!(body["dependencies"]["youtube"]["status"], "fallback");
}

#[tokio::test]
async fn test_metrics_require_basic_auth() {
    let config = Config {
        metrics_auth: "ops:secret".into(),
        ..Config::default()
    };
    let app = create_app_with(RoutedGenerator::offline(), config);

    let (status, _) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = general_purpose::STANDARD.encode("ops:wrong");
    let (status, _) = send(
        &app,
        Request::builder()
            .uri("/metrics")
            .header("authorization", format!("Basic {}", wrong))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // generate some traffic so the request counters exist
    get(&app, "/health").await;

    let right = general_purpose::STANDARD.encode("ops:secret");
    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/metrics")
            .header("authorization", format!("Basic {}", right))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("http_requests_total"));
}

#[tokio::test]
async fn test_request_id_is_echoed_or_minted() {
    let app = create_test_app(RoutedGenerator::offline());

    let response = tower::ServiceExt::oneshot(
        app.clone(),
        Request::builder()
            .uri("/health")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");

    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await
    .unwrap();
    assert!(!response.headers()["x-request-id"].is_empty());
}
