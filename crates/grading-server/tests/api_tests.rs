//! HTTP API tests driven through the router without a socket

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use grading_scenario::{EngineConfig, ScenarioStore};
use grading_server::{router, AppState};
use grading_test_utils::two_grade_ladder;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let config = EngineConfig::default().with_default_ladder(two_grade_ladder());
    router(AppState::new(ScenarioStore::in_memory(config).unwrap()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn draft_body(name: &str, base_value: f64) -> Value {
    json!({
        "name": name,
        "base_value": base_value,
        "vertical_input": {"Senior": 0.10},
        "intervals": {"ld_to_lq": 0.10, "lq_to_m": 0.10, "m_to_uq": 0.10, "uq_to_ud": 0.10}
    })
}

async fn create(app: &Router, name: &str, base_value: f64) -> String {
    let (status, body) = send(app, "POST", "/scenario", Some(draft_body(name, base_value))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_healthz() {
    let app = app();
    let (status, body) = send(&app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["scenarios"], 0);
}

#[tokio::test]
async fn test_create_returns_derived_draft() {
    let app = app();
    let (status, body) = send(&app, "POST", "/scenario", Some(draft_body("FY27", 1000.0))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "DRAFT");
    assert_eq!(body["grades"]["Base"], json!({"ld": 826.45, "lq": 909.09, "m": 1000.0, "uq": 1100.0, "ud": 1210.0}));
    assert_eq!(body["grades"]["Senior"]["ud"], 1331.0);
}

#[tokio::test]
async fn test_create_with_explicit_ladder() {
    let app = app();
    let mut body = draft_body("three", 1000.0);
    body["ladder"] = json!({"grades": ["Lead", "Senior", "Base"], "base": "Base"});
    body["vertical_input"]["Lead"] = json!(0.2);

    let (status, body) = send(&app, "POST", "/scenario", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["grades"]["Lead"]["m"], 1320.0);
}

#[tokio::test]
async fn test_validation_errors_are_422_with_details() {
    let app = app();
    let body = json!({
        "base_value": -5.0,
        "vertical_input": {"Nope": 0.1},
        "intervals": {"ld_to_lq": -0.1, "lq_to_m": 0.1, "m_to_uq": 0.1, "uq_to_ud": 0.1}
    });
    let (status, body) = send(&app, "POST", "/scenario", Some(body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    let kinds: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"unknown_grade"));
    assert!(kinds.contains(&"invalid_interval"));
    assert!(kinds.contains(&"missing_vertical_input"));
    assert!(kinds.contains(&"non_positive_median"));
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let app = app();
    let (status, body) = send(&app, "POST", "/scenario", Some(json!({"base_value": "lots"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_apply_flow_and_conflicts() {
    let app = app();
    let first = create(&app, "first", 1000.0).await;
    let second = create(&app, "second", 1100.0).await;

    let (status, _) = send(&app, "GET", "/scenario/current", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", &format!("/scenario/{first}/apply"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CURRENT");

    let (status, body) = send(&app, "POST", &format!("/scenario/{first}/apply"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    let (status, _) = send(&app, "POST", &format!("/scenario/{second}/apply"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, current) = send(&app, "GET", "/scenario/current", None).await;
    assert_eq!(current["id"], second.as_str());
    let (_, old) = send(&app, "GET", &format!("/scenario/{first}"), None).await;
    assert_eq!(old["status"], "ARCHIVED");

    let (status, list) = send(&app, "GET", "/scenario?status=archived", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_update_rename_archive() {
    let app = app();
    let id = create(&app, "draft", 1000.0).await;

    let (status, body) =
        send(&app, "PUT", &format!("/scenario/{id}"), Some(draft_body("draft v2", 2000.0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "draft v2");
    assert_eq!(body["grades"]["Base"]["m"], 2000.0);

    let (status, body) =
        send(&app, "PATCH", &format!("/scenario/{id}"), Some(json!({"name": "final"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "final");

    let (status, body) = send(&app, "POST", &format!("/scenario/{id}/archive"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ARCHIVED");

    let (status, _) = send(&app, "POST", &format!("/scenario/{id}/archive"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_impact_records_on_drafts() {
    let app = app();
    let current = create(&app, "current", 1000.0).await;
    send(&app, "POST", &format!("/scenario/{current}/apply"), None).await;
    let proposal = create(&app, "proposal", 1100.0).await;

    let headcount = json!({"Base": 10, "Senior": 5, "Principal": 2});
    let (status, body) =
        send(&app, "POST", &format!("/scenario/{proposal}/impact"), Some(headcount.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1550.0);
    assert_eq!(body["per_grade"].as_array().map(Vec::len), Some(2));

    let (_, stored) = send(&app, "GET", &format!("/scenario/{proposal}"), None).await;
    assert_eq!(stored["metrics"]["total_budget_impact"], 1550.0);

    let (status, body) =
        send(&app, "POST", &format!("/scenario/{current}/impact"), Some(headcount)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0.0);
}

#[tokio::test]
async fn test_impact_reports_on_non_drafts() {
    let app = app();
    let first = create(&app, "first", 1000.0).await;
    send(&app, "POST", &format!("/scenario/{first}/apply"), None).await;
    let second = create(&app, "second", 1100.0).await;
    let headcount = json!({"Base": 10, "Senior": 5});
    send(&app, "POST", &format!("/scenario/{second}/impact"), Some(headcount.clone())).await;
    send(&app, "POST", &format!("/scenario/{second}/apply"), None).await;

    let (status, body) =
        send(&app, "POST", &format!("/scenario/{first}/impact"), Some(headcount.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], -1550.0);

    let (status, body) =
        send(&app, "POST", &format!("/scenario/{second}/impact"), Some(headcount)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0.0);

    let (_, stored) = send(&app, "GET", &format!("/scenario/{first}"), None).await;
    assert_eq!(stored["status"], "ARCHIVED");
    assert_eq!(stored["metrics"]["total_budget_impact"], Value::Null);
}

#[tokio::test]
async fn test_compare() {
    let app = app();
    let a = create(&app, "a", 1000.0).await;
    let b = create(&app, "b", 1200.0).await;

    let (status, body) = send(&app, "GET", &format!("/scenario/compare?ids={a},{b}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["rows"][0]["grade"], "Senior");
    assert_eq!(body["rows"][0]["cells"][1]["points"]["m"], 1320.0);
    assert_eq!(body["rows"][0]["cells"][0]["source"], "stored");

    let (status, body) = send(&app, "GET", &format!("/scenario/compare?ids={a}"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = send(&app, "GET", "/scenario/compare?ids=garbage,other", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_and_malformed_ids() {
    let app = app();
    let missing = grading_scenario::ScenarioId::new();
    let (status, body) = send(&app, "GET", &format!("/scenario/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send(&app, "GET", "/scenario/not-an-id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_legacy_import() {
    let app = app();
    let body = json!({
        "name": "FY26",
        "ladder": {"grades": ["Senior", "Base"], "base": "Base"},
        "grades": {
            "Senior": {"ld": 909.09, "lq": 1000.0, "m": 1100.0, "uq": 1210.0, "ud": 1331.0},
            "Base": {"ld": 826.45, "lq": 909.09, "m": 1000.0, "uq": 1100.0, "ud": 1210.0}
        }
    });
    let (status, imported) = send(&app, "POST", "/scenario/legacy", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{imported}");
    assert_eq!(imported["status"], "CURRENT");
    assert_eq!(imported["vertical_input"], Value::Null);

    let (status, err) = send(&app, "POST", "/scenario/legacy", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "current_already_set");
}
