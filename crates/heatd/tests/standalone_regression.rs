//! Standalone regression tests.
//!
//! Drives the assembled API router end to end: classification, pushed
//! evaluations, latching, routing freeze, and the guarded reset.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use heatgrid_api::{ApiState, build_router};
use heatgrid_engine::ServerRegistry;
use heatgrid_router::FreezePolicy;
use heatgrid_sensor::{ScriptedSensor, SensorReader};

fn test_router(sensor: ScriptedSensor, admin_token: Option<&str>) -> Router {
    build_router(ApiState {
        registry: Arc::new(ServerRegistry::new(FreezePolicy::default())),
        reader: Arc::new(
            SensorReader::new(Arc::new(sensor)).with_retries(2, Duration::from_millis(1)),
        ),
        admin_token: admin_token.map(str::to_string),
    })
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn evaluate(id: &str, hit: i32) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/v1/servers/{id}/evaluate"))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "hit": hit }).to_string()))
        .unwrap()
}

fn reset(id: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/servers/{id}/reset"));
    if let Some(token) = token {
        builder = builder.header("x-admin-token", token);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn standalone_ping() {
    let router = test_router(ScriptedSensor::new(), None);
    let (status, json) = send(&router, get("/api/v1/ping")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn standalone_classify_table() {
    let router = test_router(ScriptedSensor::new(), None);
    let cases = [
        (59, "MONITOR", "GREEN"),
        (60, "WARNING", "YELLOW"),
        (65, "FAN_ON", "ORANGE"),
        (70, "FULL_COOLING", "RED"),
        (75, "DATA_SHIFT_GRADUAL", "CRITICAL"),
        (80, "DATA_SHIFT_FAST", "CRITICAL"),
        (90, "EMERGENCY_SHUTDOWN", "BLACK"),
        (-5, "MONITOR", "GREEN"),
        (140, "EMERGENCY_SHUTDOWN", "BLACK"),
    ];
    for (hit, state, severity) in cases {
        let (status, json) = send(&router, get(&format!("/api/v1/classify/{hit}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["state"], state, "hit {hit}");
        assert_eq!(json["data"]["severity"], severity, "hit {hit}");
    }
}

#[tokio::test]
async fn standalone_evaluate_latches_and_lists() {
    let router = test_router(ScriptedSensor::new(), None);

    let (_, json) = send(&router, evaluate("rack-a", 82)).await;
    assert_eq!(json["data"]["state"], "DATA_SHIFT_FAST");

    let (_, json) = send(&router, evaluate("rack-a", 30)).await;
    assert_eq!(json["data"]["state"], "DATA_SHIFT_GRADUAL");
    assert_eq!(json["data"]["locked"], false);

    send(&router, evaluate("rack-b", 40)).await;

    let (status, json) = send(&router, get("/api/v1/servers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["count"], 2);
    assert_eq!(json["data"]["servers"][0]["server_id"], "rack-a");
    assert_eq!(json["data"]["servers"][0]["data_shift_latched"], true);
    assert_eq!(json["data"]["servers"][1]["server_id"], "rack-b");
}

#[tokio::test]
async fn standalone_routing_freezes_and_releases() {
    let router = test_router(ScriptedSensor::new(), None);

    send(&router, evaluate("a", 95)).await;
    send(&router, evaluate("b", 50)).await;
    let (_, json) = send(&router, get("/api/v1/route")).await;
    assert_eq!(json["data"]["target"], "b");

    // b inside the hysteresis band stays routable.
    send(&router, evaluate("b", 85)).await;
    let (_, json) = send(&router, get("/api/v1/route")).await;
    assert_eq!(json["data"]["target"], "b");

    send(&router, evaluate("b", 91)).await;
    let (_, json) = send(&router, get("/api/v1/route")).await;
    assert_eq!(json["data"]["hold"], true);
    assert!(json["data"]["target"].is_null());
}

#[tokio::test]
async fn standalone_live_status_falls_back_to_failsafe() {
    let sensor = ScriptedSensor::new()
        .then_value(64)
        .then_failure("sensor offline")
        .then_failure("sensor offline");
    let router = test_router(sensor, None);

    let (_, json) = send(&router, get("/api/v1/servers/rack-a/live-status")).await;
    assert_eq!(json["data"]["source"], "REAL");
    assert_eq!(json["data"]["state"], "WARNING");

    let (_, json) = send(&router, get("/api/v1/servers/rack-a/live-status")).await;
    assert_eq!(json["data"]["source"], "FAILSAFE");
    assert_eq!(json["data"]["state"], "DATA_SHIFT_GRADUAL");
    assert_eq!(json["data"]["alert_message"], "Gradual Data Shift In Progress");
}

#[tokio::test]
async fn standalone_reset_requires_token() {
    let router = test_router(ScriptedSensor::new(), Some("letmein"));
    send(&router, evaluate("rack-a", 99)).await;

    let (status, _) = send(&router, reset("rack-a", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, json) = send(&router, evaluate("rack-a", 10)).await;
    assert_eq!(json["data"]["state"], "EMERGENCY_SHUTDOWN");
    assert_eq!(json["data"]["locked"], true);

    let (status, _) = send(&router, reset("rack-a", Some("letmein"))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&router, evaluate("rack-a", 10)).await;
    assert_eq!(json["data"]["state"], "MONITOR");
}

#[tokio::test]
async fn standalone_reset_disabled_without_configured_token() {
    let router = test_router(ScriptedSensor::new(), None);
    send(&router, evaluate("rack-a", 99)).await;
    let (status, json) = send(&router, reset("rack-a", Some("anything"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn standalone_malformed_requests_use_error_envelope() {
    let router = test_router(ScriptedSensor::new(), None);

    let (status, json) = send(&router, get("/api/v1/classify/hot")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string());

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/servers/rack-a/evaluate")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"hit":"warm"}"#))
        .unwrap();
    let (status, json) = send(&router, req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["success"], false);

    // Nothing was registered by the rejected body.
    let (_, json) = send(&router, get("/api/v1/servers")).await;
    assert_eq!(json["data"]["count"], 0);
}
