//! REST API handlers.
//!
//! Each handler goes through the shared `ServerRegistry` and returns the
//! same `{success, data | error}` JSON envelope.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::warn;

use heat_core::{Action, LoadReading, Provenance, Severity, StateId, classify};
use heatgrid_engine::CycleReport;

use crate::{ADMIN_TOKEN_HEADER, ApiState};

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// Malformed path or body, in the same envelope as every other error.
fn rejection_response(status: StatusCode, detail: String) -> axum::response::Response {
    error_response(&detail, status).into_response()
}

/// What the server team screen shows after one cycle.
#[derive(Debug, Serialize)]
pub struct LiveStatus {
    pub server_id: String,
    pub timestamp: u64,
    pub source: Provenance,
    pub cpu: Option<f64>,
    pub ram: Option<f64>,
    pub hit: i32,
    pub state: StateId,
    pub severity: Severity,
    pub actions: Vec<Action>,
    pub locked: bool,
    pub freeze: bool,
    pub alert_message: &'static str,
}

impl From<CycleReport> for LiveStatus {
    fn from(report: CycleReport) -> Self {
        Self {
            alert_message: report.decision.state.alert_message(),
            server_id: report.server_id,
            timestamp: report.timestamp,
            source: report.reading.provenance,
            cpu: report.reading.cpu,
            ram: report.reading.ram,
            hit: report.reading.value,
            state: report.decision.state,
            severity: report.decision.severity,
            actions: report.decision.actions,
            locked: report.decision.locked,
            freeze: report.freeze,
        }
    }
}

// ── Basics ─────────────────────────────────────────────────────

/// GET /api/v1/ping
pub async fn ping() -> impl IntoResponse {
    ApiResponse::ok(serde_json::json!({ "status": "ok", "service": "heatgrid" }))
}

/// GET /api/v1/classify/:hit
pub async fn classify_hit(hit: Result<Path<i32>, PathRejection>) -> impl IntoResponse {
    let Path(hit) = match hit {
        Ok(hit) => hit,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };

    let classification = classify(hit);
    ApiResponse::ok(serde_json::json!({
        "hit": hit,
        "state": classification.state,
        "severity": classification.severity,
        "actions": classification.actions,
        "alert_message": classification.state.alert_message(),
    }))
    .into_response()
}

// ── Servers ────────────────────────────────────────────────────

/// GET /api/v1/servers
pub async fn list_servers(State(state): State<ApiState>) -> impl IntoResponse {
    let servers = state.registry.list();
    ApiResponse::ok(serde_json::json!({
        "count": servers.len(),
        "servers": servers,
    }))
}

/// GET /api/v1/servers/:id
pub async fn get_server(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.registry.get(&id) {
        Some(status) => ApiResponse::ok(status).into_response(),
        None => error_response("server not found", StatusCode::NOT_FOUND).into_response(),
    }
}

/// Evaluate request body.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub hit: i32,
    #[serde(default)]
    pub provenance: Option<Provenance>,
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub ram: Option<f64>,
}

/// POST /api/v1/servers/:id/evaluate
pub async fn evaluate_server(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    req: Result<Json<EvaluateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match req {
        Ok(req) => req,
        Err(rejection) => return rejection_response(rejection.status(), rejection.body_text()),
    };

    let mut reading = LoadReading::new(req.hit, req.provenance.unwrap_or(Provenance::Real));
    reading.cpu = req.cpu;
    reading.ram = req.ram;

    let report = state.registry.evaluate(&id, reading);
    ApiResponse::ok(LiveStatus::from(report)).into_response()
}

/// GET /api/v1/servers/:id/live-status
pub async fn live_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let report = state.registry.run_cycle(&id, &state.reader).await;
    ApiResponse::ok(LiveStatus::from(report))
}

/// POST /api/v1/servers/:id/reset
pub async fn reset_server(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(expected) = state.admin_token.as_deref() else {
        return error_response("reset is disabled: no admin token configured", StatusCode::FORBIDDEN)
            .into_response();
    };

    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected) {
        warn!(server_id = %id, "rejected reset with missing or wrong admin token");
        return error_response("invalid admin token", StatusCode::FORBIDDEN).into_response();
    }

    if state.registry.reset(&id) {
        ApiResponse::ok(serde_json::json!({ "server_id": id, "status": "RESET" })).into_response()
    } else {
        error_response("server not found", StatusCode::NOT_FOUND).into_response()
    }
}

// ── Routing ────────────────────────────────────────────────────

/// GET /api/v1/route
pub async fn route_target(State(state): State<ApiState>) -> impl IntoResponse {
    let target = state.registry.select_target();
    ApiResponse::ok(serde_json::json!({
        "hold": target.is_none(),
        "target": target,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::to_bytes;
    use axum::http::HeaderValue;
    use axum::response::Response;
    use heatgrid_engine::ServerRegistry;
    use heatgrid_sensor::{ScriptedSensor, SensorReader};

    fn test_state(sensor: ScriptedSensor, admin_token: Option<&str>) -> ApiState {
        ApiState {
            registry: Arc::new(ServerRegistry::default()),
            reader: Arc::new(
                SensorReader::new(Arc::new(sensor)).with_retries(1, Duration::from_millis(1)),
            ),
            admin_token: admin_token.map(str::to_string),
        }
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn token_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_TOKEN_HEADER, HeaderValue::from_str(token).unwrap());
        headers
    }

    #[tokio::test]
    async fn classify_endpoint_is_stateless() {
        let resp = classify_hit(Ok(Path(90))).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["state"], "EMERGENCY_SHUTDOWN");
        assert_eq!(json["data"]["severity"], "BLACK");
        assert_eq!(json["data"]["actions"], serde_json::json!(["shutdown_server"]));
    }

    #[tokio::test]
    async fn get_unknown_server_is_not_found() {
        let state = test_state(ScriptedSensor::new(), None);
        let resp = get_server(State(state), Path("nope".to_string())).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn evaluate_then_get() {
        let state = test_state(ScriptedSensor::new(), None);
        let req = EvaluateRequest {
            hit: 72,
            provenance: None,
            cpu: Some(72.0),
            ram: Some(40.5),
        };
        let resp = evaluate_server(State(state.clone()), Path("rack-a".to_string()), Ok(Json(req)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["state"], "FULL_COOLING");
        assert_eq!(json["data"]["source"], "REAL");
        assert_eq!(json["data"]["cpu"], 72.0);
        assert_eq!(json["data"]["alert_message"], "Full Cooling System Active");

        let resp = get_server(State(state), Path("rack-a".to_string())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn live_status_reads_the_sensor() {
        let state = test_state(ScriptedSensor::new().then_value(61), None);
        let resp = live_status(State(state.clone()), Path("rack-a".to_string()))
            .await
            .into_response();
        let json = body_json(resp).await;
        assert_eq!(json["data"]["hit"], 61);
        assert_eq!(json["data"]["state"], "WARNING");

        // Sensor has run dry: fail-safe reading.
        let resp = live_status(State(state), Path("rack-a".to_string()))
            .await
            .into_response();
        let json = body_json(resp).await;
        assert_eq!(json["data"]["source"], "FAILSAFE");
        assert_eq!(json["data"]["hit"], 75);
        assert_eq!(json["data"]["state"], "DATA_SHIFT_GRADUAL");
    }

    #[tokio::test]
    async fn reset_disabled_without_token() {
        let state = test_state(ScriptedSensor::new(), None);
        state.registry.evaluate("a", LoadReading::real(95));
        let resp = reset_server(State(state), Path("a".to_string()), token_headers("x"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn reset_rejects_wrong_token() {
        let state = test_state(ScriptedSensor::new(), Some("s3cret"));
        state.registry.evaluate("a", LoadReading::real(95));

        let resp = reset_server(State(state.clone()), Path("a".to_string()), HeaderMap::new())
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = reset_server(State(state.clone()), Path("a".to_string()), token_headers("guess"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(state.registry.get("a").unwrap().shutdown_latched);
    }

    #[tokio::test]
    async fn reset_with_token_clears_latches() {
        let state = test_state(ScriptedSensor::new(), Some("s3cret"));
        state.registry.evaluate("a", LoadReading::real(95));

        let resp = reset_server(State(state.clone()), Path("a".to_string()), token_headers("s3cret"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!state.registry.get("a").unwrap().shutdown_latched);

        let resp = reset_server(State(state), Path("ghost".to_string()), token_headers("s3cret"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn route_holds_when_everything_is_frozen() {
        let state = test_state(ScriptedSensor::new(), None);
        let resp = route_target(State(state.clone())).await.into_response();
        let json = body_json(resp).await;
        assert_eq!(json["data"]["hold"], true);
        assert!(json["data"]["target"].is_null());

        state.registry.evaluate("a", LoadReading::real(30));
        state.registry.evaluate("b", LoadReading::real(20));
        let resp = route_target(State(state)).await.into_response();
        let json = body_json(resp).await;
        assert_eq!(json["data"]["target"], "b");
        assert_eq!(json["data"]["hold"], false);
    }
}
