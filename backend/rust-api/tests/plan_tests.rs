use axum::http::StatusCode;
use serde_json::json;

mod common;

use common::{create_test_app, post_json, RoutedGenerator, PLAN_MARKER};

#[tokio::test]
async fn test_generated_plan_is_repaired() {
    let reply = r#"Here is your plan:
```json
{
  "planTitle": "SQL Interview Sprint",
  "modules": [
    {"id": "joins", "title": "Joins", "priority": "CRITICAL", "keyConceptsPreview": ["inner", "outer"]},
    {"id": "joins", "title": "Indexes", "suggestedSearchKeywords": "b-tree, covering index"},
    {"title": "Window Functions", "priority": "nice to have"}
  ]
}
```"#;
    let app = create_test_app(RoutedGenerator::offline().route(PLAN_MARKER, reply));

    let (status, body) = post_json(
        &app,
        "/api/v1/plans",
        json!({ "goal": "SQL interview", "timeConstraint": "2 days" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "unexpected body {}", body);
    let plan = &body["learningPlan"];
    assert_eq!(plan["planTitle"], "SQL Interview Sprint");
    assert_eq!(
        plan["description"],
        "Focused study plan for SQL interview with 2 days time available."
    );

    let modules = plan["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 3);

    assert_eq!(modules[0]["id"], "joins");
    assert_eq!(modules[0]["status"], "active");
    assert_eq!(modules[0]["priority"], "critical");
    assert_eq!(modules[0]["keyConceptsPreview"], "inner, outer");
    assert_eq!(modules[0]["estimatedTime"], "30-45 minutes");
    assert_eq!(modules[0]["suggestedSearchKeywords"][1], "Joins exam questions");

    assert_eq!(modules[1]["id"], "joins-2");
    assert_eq!(modules[1]["status"], "pending");
    assert_eq!(modules[1]["priority"], "critical");
    assert_eq!(
        modules[1]["suggestedSearchKeywords"],
        json!(["b-tree", "covering index"])
    );

    assert_eq!(modules[2]["priority"], "important");
    assert!(modules[2]["id"].as_str().unwrap().starts_with("module-3-"));
}

#[tokio::test]
async fn test_unusable_reply_falls_back_to_three_modules() {
    let app = create_test_app(RoutedGenerator::offline().route(PLAN_MARKER, "not json at all"));

    let (status, body) = post_json(&app, "/api/v1/plans", json!({ "goal": "Graph theory" })).await;

    assert_eq!(status, StatusCode::OK);
    let plan = &body["learningPlan"];
    assert_eq!(plan["planTitle"], "Graph theory Rapid Revision Plan");
    assert_eq!(
        plan["description"],
        "Focused study plan for Graph theory with 24 hours time available."
    );

    let titles: Vec<_> = plan["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["Core Concepts", "Common Problems", "Advanced Topics"]);
    assert_eq!(plan["modules"][0]["priority"], "critical");
    assert_eq!(plan["modules"][1]["priority"], "important");
    assert_eq!(plan["modules"][2]["priority"], "helpful");
}

#[tokio::test]
async fn test_model_failure_still_returns_plan() {
    let app = create_test_app(RoutedGenerator::offline());

    let (status, body) = post_json(&app, "/api/v1/plans", json!({ "examGoal": "Calculus" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["learningPlan"]["modules"].as_array().unwrap().len(), 3);
    assert_eq!(
        body["learningPlan"]["modules"][0]["suggestedSearchKeywords"][0],
        "Calculus"
    );
}

#[tokio::test]
async fn test_blank_goal_is_rejected() {
    let app = create_test_app(RoutedGenerator::offline());

    let (status, body) = post_json(&app, "/api/v1/plans", json!({ "goal": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(body["error"]["message"], "Goal is required");

    let (status, _) = post_json(&app, "/api/v1/plans", json!({ "goal": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_a_json_error() {
    let app = create_test_app(RoutedGenerator::offline());

    let response = common::send(
        &app,
        axum::http::Request::builder()
            .method("POST")
            .uri("/api/v1/plans")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap(),
    )
    .await;

    assert_eq!(response.0, StatusCode::BAD_REQUEST);
    assert!(response.1["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to parse JSON request body"));
}
