use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

use common::{create_test_app, post_json, RoutedGenerator};

const VIDEO_MARKER: &str = "high-quality YouTube videos";
const ARTICLE_MARKER: &str = "high-quality web articles";

fn discover_body() -> Value {
    json!({
        "moduleId": "module-1",
        "moduleTitle": "Binary Trees",
        "moduleDescription": "Traversals and balancing",
        "searchKeywords": ["binary tree", "tree traversal", "avl tree"]
    })
}

#[tokio::test]
async fn test_offline_discovery_returns_two_of_each_videos_first() {
    let app = create_test_app(RoutedGenerator::offline());

    let (status, body) = post_json(&app, "/api/v1/resources", discover_body()).await;

    assert_eq!(status, StatusCode::OK, "unexpected body {}", body);
    let resources = body["resources"].as_array().unwrap();
    let kinds: Vec<_> = resources.iter().map(|r| r["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, ["video", "video", "article", "article"]);

    assert_eq!(resources[0]["videoId"], "dQw4w9WgXcQ");
    assert_eq!(resources[2]["url"], "https://example.com/article1");
    assert!(resources[0]["id"]
        .as_str()
        .unwrap()
        .starts_with("video-module-1-"));
    for resource in resources {
        assert_eq!(resource["consumed"], false);
        assert!(!resource["aiJustification"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_model_selection_keeps_justifications() {
    let videos = r#"[{"videoId": "xvFZjo5PgG0", "aiJustification": "Clear walkthrough of traversals"}]"#;
    let articles = r#"```json
[{"url": "https://example.com/article3", "title": "AVL in practice", "aiJustification": "Covers balancing"}]
```"#;
    let app = create_test_app(
        RoutedGenerator::offline()
            .route(VIDEO_MARKER, videos)
            .route(ARTICLE_MARKER, articles),
    );

    let (status, body) = post_json(&app, "/api/v1/resources", discover_body()).await;

    assert_eq!(status, StatusCode::OK);
    let resources = body["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 2);

    assert_eq!(resources[0]["videoId"], "xvFZjo5PgG0");
    assert_eq!(resources[0]["title"], "tree traversal Tutorial for Beginners");
    assert_eq!(resources[0]["aiJustification"], "Clear walkthrough of traversals");

    assert_eq!(resources[1]["url"], "https://example.com/article3");
    assert_eq!(resources[1]["title"], "AVL in practice");
}

#[tokio::test]
async fn test_empty_selection_gives_placeholders() {
    let app = create_test_app(
        RoutedGenerator::offline()
            .route(VIDEO_MARKER, "[]")
            .route(ARTICLE_MARKER, "[]"),
    );

    let (status, body) = post_json(&app, "/api/v1/resources", discover_body()).await;

    assert_eq!(status, StatusCode::OK);
    let resources = body["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0]["title"], "Introduction to Binary Trees");
    assert_eq!(resources[1]["title"], "Getting Started with Binary Trees");
}

#[tokio::test]
async fn test_missing_keywords_rejected() {
    let app = create_test_app(RoutedGenerator::offline());

    let mut body = discover_body();
    body["searchKeywords"] = json!([]);

    let (status, body) = post_json(&app, "/api/v1/resources", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "searchKeywords must not be empty");
}
